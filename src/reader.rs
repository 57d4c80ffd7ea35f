//! Reading MARC records from binary streams.
//!
//! This module provides [`MarcReader`] for reading ISO 2709 formatted MARC
//! records from any source that implements [`std::io::Read`].
//!
//! Reading is fail-fast: any malformation is a fatal error for the run.
//! A clean end of stream is reported as `Ok(None)`, never as an error.
//!
//! # Examples
//!
//! ```no_run
//! use marcgrep::MarcReader;
//! use std::fs::File;
//!
//! let file = File::open("records.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     println!("Record type: {}", record.leader.record_type);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::directory::DirectoryEntry;
use crate::error::{MarcError, Result};
use crate::leader::{Leader, LEADER_LENGTH};
use crate::record::{Field, Record, FIELD_TERMINATOR, RECORD_TERMINATOR};
use std::io::Read;

/// Reader for ISO 2709 binary MARC format.
///
/// `MarcReader` reads one MARC record at a time from any source implementing
/// [`std::io::Read`]. Records are fully parsed and returned as [`Record`]
/// instances.
#[derive(Debug)]
pub struct MarcReader<R: Read> {
    reader: R,
    records_read: usize,
}

impl<R: Read> MarcReader<R> {
    /// Create a new MARC reader over any [`std::io::Read`] source.
    pub fn new(reader: R) -> Self {
        MarcReader {
            reader,
            records_read: 0,
        }
    }

    /// Number of records read so far.
    #[must_use]
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Read a single MARC record.
    ///
    /// Returns `Ok(Some(record))` if a record was successfully read, or
    /// `Ok(None)` on a clean end of stream (no bytes left before the next
    /// leader).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The stream ends mid-record (`TruncatedRecord`)
    /// - The leader, directory, or a field is malformed
    /// - A field slice or the record does not end with its terminator
    /// - An I/O error occurs
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        // Read the leader (24 bytes); EOF here is a clean end of stream.
        let mut leader_bytes = [0u8; LEADER_LENGTH];
        match self.reader.read_exact(&mut leader_bytes) {
            Ok(()) => {},
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            },
            Err(e) => return Err(MarcError::IoError(e)),
        }

        let leader = Leader::from_bytes(&leader_bytes)?;
        leader.validate_for_reading()?;

        let record_length = leader.record_length as usize;
        let base_address = leader.data_base_address as usize;
        if base_address > record_length {
            return Err(MarcError::InvalidRecord(format!(
                "Base address {base_address} exceeds record length {record_length}"
            )));
        }

        // Directory runs from the end of the leader to the base address.
        let directory_length = base_address - LEADER_LENGTH;
        let mut directory_bytes = vec![0u8; directory_length];
        self.read_body(&mut directory_bytes, "directory")?;
        let entries = DirectoryEntry::parse_all(&directory_bytes)?;

        // Field data runs from the base address to the end of the record.
        let data_length = record_length - base_address;
        let mut data = vec![0u8; data_length];
        self.read_body(&mut data, "field data")?;

        if data.last() != Some(&RECORD_TERMINATOR) {
            return Err(MarcError::InvalidRecord(
                "Record does not end with the record terminator".to_string(),
            ));
        }
        let data = &data[..data.len() - 1];

        let mut fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let start = entry.field_offset;
            let end = start + entry.field_length;
            if end > data.len() {
                return Err(MarcError::InvalidRecord(format!(
                    "Field {} exceeds the data area",
                    entry.tag
                )));
            }
            let slice = &data[start..end];
            if slice.last() != Some(&FIELD_TERMINATOR) {
                return Err(MarcError::InvalidField(format!(
                    "Field {} does not end with the field terminator",
                    entry.tag
                )));
            }
            fields.push(Field::new(entry.tag.clone(), &slice[..slice.len() - 1]));
        }

        self.records_read += 1;
        Ok(Some(Record::from_fields(leader, fields)))
    }

    fn read_body(&mut self, buffer: &mut [u8], what: &str) -> Result<()> {
        match self.reader.read_exact(buffer) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(MarcError::TruncatedRecord(format!(
                    "Unexpected end of stream while reading {what}"
                )))
            },
            Err(e) => Err(MarcError::IoError(e)),
        }
    }
}
