//! MARC record leader parsing and manipulation.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC
//! record. It contains metadata describing the record's structure, content
//! type, and encoding.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = MARC-8, a = UTF-8)
//! - Position 10: Indicator count (usually 2)
//! - Position 11: Subfield code count (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Reserved (usually "4500")

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};

/// Total length of the leader in bytes.
pub const LEADER_LENGTH: usize = 24;

/// The largest record length the 5-digit leader field can express.
pub const MAX_RECORD_LENGTH: usize = 99_999;

/// MARC Leader - 24 bytes at the start of every MARC record.
///
/// Contains metadata about the record structure and content. All MARC
/// records must begin with exactly 24 bytes of leader information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leader {
    /// Record length (5 digits) - positions 0-4
    pub record_length: u32,
    /// Record status (1 char) - position 5
    pub record_status: char,
    /// Type of record (1 char) - position 6
    pub record_type: char,
    /// Bibliographic level (1 char) - position 7
    pub bibliographic_level: char,
    /// Type of control record (1 char) - position 8
    pub control_record_type: char,
    /// Character coding scheme (1 char) - position 9
    pub character_coding: char,
    /// Indicator count (1 digit) - position 10 (usually 2)
    pub indicator_count: u8,
    /// Subfield code count (1 digit) - position 11 (usually 2)
    pub subfield_code_count: u8,
    /// Base address of data (5 digits) - positions 12-16
    pub data_base_address: u32,
    /// Encoding level (1 char) - position 17
    pub encoding_level: char,
    /// Cataloging form (1 char) - position 18
    pub cataloging_form: char,
    /// Multipart resource record level (1 char) - position 19
    pub multipart_level: char,
    /// Reserved (4 chars) - positions 20-23
    pub reserved: String,
}

impl Leader {
    /// Parse a leader from exactly 24 bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 24 bytes long or any of
    /// the fixed-width numeric subfields fails to scan as ASCII digits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Leader must be exactly {LEADER_LENGTH} bytes, got {}",
                bytes.len()
            )));
        }

        let record_length = parse_digits(&bytes[0..5])?;
        let record_status = bytes[5] as char;
        let record_type = bytes[6] as char;
        let bibliographic_level = bytes[7] as char;
        let control_record_type = bytes[8] as char;
        let character_coding = bytes[9] as char;

        let indicator_count = u8::try_from((bytes[10] as char).to_digit(10).ok_or_else(|| {
            MarcError::InvalidLeader(format!(
                "Invalid indicator count at position 10: {}",
                bytes[10] as char
            ))
        })?)
        .map_err(|_| MarcError::InvalidLeader("Indicator count exceeds valid range".to_string()))?;

        let subfield_code_count =
            u8::try_from((bytes[11] as char).to_digit(10).ok_or_else(|| {
                MarcError::InvalidLeader(format!(
                    "Invalid subfield code count at position 11: {}",
                    bytes[11] as char
                ))
            })?)
            .map_err(|_| {
                MarcError::InvalidLeader("Subfield code count exceeds valid range".to_string())
            })?;

        let data_base_address = parse_digits(&bytes[12..17])?;
        let encoding_level = bytes[17] as char;
        let cataloging_form = bytes[18] as char;
        let multipart_level = bytes[19] as char;
        let reserved = String::from_utf8_lossy(&bytes[20..24]).to_string();

        Ok(Leader {
            record_length,
            record_status,
            record_type,
            bibliographic_level,
            control_record_type,
            character_coding,
            indicator_count,
            subfield_code_count,
            data_base_address,
            encoding_level,
            cataloging_form,
            multipart_level,
            reserved,
        })
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// Checks that `record_length` is at least 24 and `data_base_address` is
    /// strictly greater than 24 (the minimal record carries one directory
    /// terminator byte after the leader), which is required before
    /// performing offset arithmetic during binary parsing.
    ///
    /// # Errors
    ///
    /// Returns an error if `record_length` is less than 24 or
    /// `data_base_address` is not greater than 24.
    pub fn validate_for_reading(&self) -> Result<()> {
        if (self.record_length as usize) < LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Record length must be at least 24, got {}",
                self.record_length
            )));
        }
        if self.data_base_address as usize <= LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Base address of data must be greater than 24, got {}",
                self.data_base_address
            )));
        }
        Ok(())
    }

    /// Serialize leader to a 24-byte buffer.
    ///
    /// All numeric fields are re-emitted zero-padded to their fixed width.
    ///
    /// # Errors
    ///
    /// Returns an error if the leader values are invalid for serialization
    /// (reserved field not 4 characters, record length above the format
    /// maximum).
    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        if self.record_length as usize > MAX_RECORD_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Record length {} exceeds format maximum {MAX_RECORD_LENGTH}",
                self.record_length
            )));
        }

        let mut bytes = Vec::with_capacity(LEADER_LENGTH);

        // Record length (5 digits, zero-padded)
        bytes.extend_from_slice(format!("{:05}", self.record_length).as_bytes());
        bytes.push(self.record_status as u8);
        bytes.push(self.record_type as u8);
        bytes.push(self.bibliographic_level as u8);
        bytes.push(self.control_record_type as u8);
        bytes.push(self.character_coding as u8);
        bytes.push(b'0' + self.indicator_count);
        bytes.push(b'0' + self.subfield_code_count);

        // Base address of data (5 digits, zero-padded)
        bytes.extend_from_slice(format!("{:05}", self.data_base_address).as_bytes());
        bytes.push(self.encoding_level as u8);
        bytes.push(self.cataloging_form as u8);
        bytes.push(self.multipart_level as u8);

        // Reserved (4 bytes)
        let reserved_bytes = self.reserved.as_bytes();
        if reserved_bytes.len() != 4 {
            return Err(MarcError::InvalidLeader(format!(
                "Reserved field must be 4 characters, got {}",
                reserved_bytes.len()
            )));
        }
        bytes.extend_from_slice(reserved_bytes);

        Ok(bytes)
    }

    /// True if the bibliographic level marks this record as a serial.
    #[must_use]
    pub fn is_serial(&self) -> bool {
        self.bibliographic_level == 's'
    }

    /// True if the bibliographic level marks this record as a monograph.
    #[must_use]
    pub fn is_monograph(&self) -> bool {
        self.bibliographic_level == 'm'
    }

    /// True if the bibliographic level marks this record as an article
    /// (a monographic or serial component part).
    #[must_use]
    pub fn is_article(&self) -> bool {
        self.bibliographic_level == 'a' || self.bibliographic_level == 'b'
    }
}

/// Parse a 5-digit ASCII number from bytes.
fn parse_digits(bytes: &[u8]) -> Result<u32> {
    if bytes.len() != 5 {
        return Err(MarcError::InvalidLeader(format!(
            "Expected 5-digit field, got {} bytes",
            bytes.len()
        )));
    }

    let s = String::from_utf8_lossy(bytes);
    if !bytes.iter().all(u8::is_ascii_digit) {
        return Err(MarcError::InvalidLeader(format!(
            "Invalid numeric field: '{s}'"
        )));
    }
    s.parse::<u32>()
        .map_err(|_| MarcError::InvalidLeader(format!("Invalid numeric field: '{s}'")))
}
