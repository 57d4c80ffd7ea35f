//! MARC directory entry parsing and serialization.
//!
//! The directory sits between the leader and the field data. It is a
//! sequence of fixed 12-byte entries, one per variable field, terminated by
//! a single field-terminator byte (0x1E). Each entry is:
//!
//! - Bytes 0-2: field tag (3 characters)
//! - Bytes 3-6: field length, 4 ASCII digits, zero-padded; includes the
//!   field's trailing terminator byte
//! - Bytes 7-11: field offset relative to the base address of data,
//!   5 ASCII digits, zero-padded

use crate::error::{MarcError, Result};
use crate::record::FIELD_TERMINATOR;
use std::ops::Range;

/// Serialized size of one directory entry.
pub const DIRECTORY_ENTRY_LENGTH: usize = 12;

/// One 12-byte directory entry: a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Field tag (3 characters).
    pub tag: String,
    /// Field length in bytes, including the trailing field terminator.
    pub field_length: usize,
    /// Field offset in bytes, relative to the base address of data.
    pub field_offset: usize,
}

impl DirectoryEntry {
    /// Parse one entry from exactly 12 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 12 bytes or the length
    /// or offset digit groups do not scan as unsigned integers.
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        if raw.len() != DIRECTORY_ENTRY_LENGTH {
            return Err(MarcError::InvalidDirectoryEntry(format!(
                "Entry must be exactly {DIRECTORY_ENTRY_LENGTH} bytes, got {}",
                raw.len()
            )));
        }

        let tag = String::from_utf8_lossy(&raw[0..3]).to_string();
        let field_length = parse_unsigned(&raw[3..7])?;
        let field_offset = parse_unsigned(&raw[7..12])?;

        Ok(DirectoryEntry {
            tag,
            field_length,
            field_offset,
        })
    }

    /// Serialize this entry to its 12-byte form.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is not 3 bytes, the length does not fit
    /// in 4 digits, or the offset does not fit in 5 digits.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        if self.tag.len() != 3 {
            return Err(MarcError::InvalidDirectoryEntry(format!(
                "Tag must be 3 characters, got '{}'",
                self.tag
            )));
        }
        if self.field_length > 9_999 {
            return Err(MarcError::InvalidDirectoryEntry(format!(
                "Field length {} does not fit in 4 digits",
                self.field_length
            )));
        }
        if self.field_offset > 99_999 {
            return Err(MarcError::InvalidDirectoryEntry(format!(
                "Field offset {} does not fit in 5 digits",
                self.field_offset
            )));
        }

        let mut bytes = Vec::with_capacity(DIRECTORY_ENTRY_LENGTH);
        bytes.extend_from_slice(self.tag.as_bytes());
        bytes.extend_from_slice(format!("{:04}", self.field_length).as_bytes());
        bytes.extend_from_slice(format!("{:05}", self.field_offset).as_bytes());
        Ok(bytes)
    }

    /// Parse a whole directory: N entries followed by one field terminator.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte count is not `12 * N + 1`, the final
    /// byte is not the field terminator, or any entry fails to parse.
    pub fn parse_all(directory: &[u8]) -> Result<Vec<DirectoryEntry>> {
        if directory.is_empty() || directory.len() % DIRECTORY_ENTRY_LENGTH != 1 {
            return Err(MarcError::InvalidRecord(format!(
                "Directory length must be 12 * N + 1, got {}",
                directory.len()
            )));
        }
        if directory[directory.len() - 1] != FIELD_TERMINATOR {
            return Err(MarcError::InvalidRecord(
                "Directory does not end with the field terminator".to_string(),
            ));
        }

        directory[..directory.len() - 1]
            .chunks(DIRECTORY_ENTRY_LENGTH)
            .map(DirectoryEntry::from_bytes)
            .collect()
    }

    /// Serialize an entry sequence as a whole directory, including the
    /// trailing field terminator. Inverse of [`DirectoryEntry::parse_all`].
    ///
    /// # Errors
    ///
    /// Returns an error if any entry fails to serialize.
    pub fn serialize_all(entries: &[DirectoryEntry]) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(entries.len() * DIRECTORY_ENTRY_LENGTH + 1);
        for entry in entries {
            bytes.extend_from_slice(&entry.to_bytes()?);
        }
        bytes.push(FIELD_TERMINATOR);
        Ok(bytes)
    }
}

/// Find the index of the first entry with a matching tag.
#[must_use]
pub fn find_first(entries: &[DirectoryEntry], tag: &str) -> Option<usize> {
    entries.iter().position(|entry| entry.tag == tag)
}

/// Find the maximal contiguous run of entries with a matching tag, starting
/// at the first hit.
///
/// The format places same-tag entries contiguously by convention, not by an
/// enforced invariant; a later non-contiguous occurrence is not included.
#[must_use]
pub fn find_range(entries: &[DirectoryEntry], tag: &str) -> Option<Range<usize>> {
    let start = find_first(entries, tag)?;
    let end = entries[start..]
        .iter()
        .position(|entry| entry.tag != tag)
        .map_or(entries.len(), |offset| start + offset);
    Some(start..end)
}

/// Parse a fixed-width ASCII digit group without string allocation.
fn parse_unsigned(bytes: &[u8]) -> Result<usize> {
    let mut result = 0usize;
    for &byte in bytes {
        if byte.is_ascii_digit() {
            result = result * 10 + (byte - b'0') as usize;
        } else {
            return Err(MarcError::InvalidDirectoryEntry(format!(
                "Invalid numeric field: expected digits, got byte {}",
                byte as char
            )));
        }
    }
    Ok(result)
}
