//! Writing MARC records to binary format.
//!
//! [`compose`] serializes a [`Record`] to ISO 2709 bytes, recomputing the
//! directory, the base address of data, and the record length from the
//! record's current fields. [`MarcWriter`] streams composed records to any
//! destination implementing [`std::io::Write`].
//!
//! # Examples
//!
//! ```
//! use marcgrep::{Leader, MarcWriter, Record};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let leader = Leader::from_bytes(b"00000nam a2200000 i 4500")?;
//! let mut record = Record::new(leader);
//! record.insert_field("001", b"12345".to_vec());
//! record.insert_field("245", b"10\x1faTest Title".to_vec());
//!
//! let mut buffer = Vec::new();
//! let mut writer = MarcWriter::new(&mut buffer);
//! writer.write_record(&record)?;
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```

use crate::directory::DirectoryEntry;
use crate::error::{MarcError, Result};
use crate::leader::{LEADER_LENGTH, MAX_RECORD_LENGTH};
use crate::record::{Record, FIELD_TERMINATOR, RECORD_TERMINATOR};
use std::io::Write;

/// Serialize a record to ISO 2709 bytes.
///
/// The directory is derived from the fields in record order: each entry's
/// length is the content length plus the field terminator, each offset is
/// the running total of the lengths before it. The leader's record length
/// and base address of data are recomputed to match; the stored record
/// length always equals the actual serialized byte count.
///
/// # Errors
///
/// Returns an error if the composed record would exceed the 99,999-byte
/// format maximum, a field length or offset does not fit its fixed-width
/// directory slot, or the leader fails to serialize.
pub fn compose(record: &Record) -> Result<Vec<u8>> {
    let mut entries = Vec::with_capacity(record.field_count());
    let mut offset = 0usize;
    for field in record.fields() {
        entries.push(DirectoryEntry {
            tag: field.tag.clone(),
            field_length: field.wire_length(),
            field_offset: offset,
        });
        offset += field.wire_length();
    }
    let directory = DirectoryEntry::serialize_all(&entries)?;

    let base_address = LEADER_LENGTH + directory.len();
    let record_length = base_address + offset + 1;
    if record_length > MAX_RECORD_LENGTH {
        return Err(MarcError::InvalidRecord(format!(
            "Composed record is {record_length} bytes, format maximum is {MAX_RECORD_LENGTH}"
        )));
    }

    let mut leader = record.leader.clone();
    leader.record_length = u32::try_from(record_length)
        .map_err(|_| MarcError::InvalidRecord("Record length overflow".to_string()))?;
    leader.data_base_address = u32::try_from(base_address)
        .map_err(|_| MarcError::InvalidRecord("Base address overflow".to_string()))?;

    let mut bytes = Vec::with_capacity(record_length);
    bytes.extend_from_slice(&leader.as_bytes()?);
    bytes.extend_from_slice(&directory);
    for field in record.fields() {
        bytes.extend_from_slice(&field.content);
        bytes.push(FIELD_TERMINATOR);
    }
    bytes.push(RECORD_TERMINATOR);
    Ok(bytes)
}

/// Writer for ISO 2709 binary MARC format.
#[derive(Debug)]
pub struct MarcWriter<W: Write> {
    writer: W,
    records_written: usize,
    finished: bool,
}

impl<W: Write> MarcWriter<W> {
    /// Create a new MARC writer over any [`std::io::Write`] destination.
    pub fn new(writer: W) -> Self {
        MarcWriter {
            writer,
            records_written: 0,
            finished: false,
        }
    }

    /// Compose and write a single record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record fails to compose, the writer has
    /// already been finished, or an I/O error occurs.
    pub fn write_record(&mut self, record: &Record) -> Result<()> {
        if self.finished {
            return Err(MarcError::InvalidRecord(
                "Cannot write to a finished writer".to_string(),
            ));
        }
        let bytes = compose(record)?;
        self.writer.write_all(&bytes)?;
        self.records_written += 1;
        Ok(())
    }

    /// Flush the writer and mark it as finished.
    ///
    /// After calling `finish`, no more records can be written.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing the underlying writer fails.
    pub fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.finished = true;
        Ok(())
    }

    /// Number of records written so far.
    #[must_use]
    pub fn records_written(&self) -> usize {
        self.records_written
    }
}
