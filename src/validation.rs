//! Structural validation of raw record bytes.
//!
//! [`check_structure`] answers "does this byte buffer look like one
//! well-formed MARC record?" without building a [`crate::Record`]. It is
//! the check augmentation tools run before trusting a record they are about
//! to mutate, and the detail in its error says what failed.

use crate::error::{MarcError, Result};
use crate::leader::{Leader, LEADER_LENGTH, MAX_RECORD_LENGTH};
use crate::record::{FIELD_TERMINATOR, RECORD_TERMINATOR};

/// Check that raw bytes form one structurally valid MARC record.
///
/// Verifies, in order: the leader parses; the declared record length equals
/// the actual byte count; the length is within the 99,999-byte format
/// maximum; the base address of data is past the leader; the directory
/// region is `12 * N + 1` bytes ending with the field terminator; and the
/// record ends with the record terminator.
///
/// # Errors
///
/// Returns the first failed check as a [`MarcError`] with detail.
pub fn check_structure(record_bytes: &[u8]) -> Result<()> {
    if record_bytes.len() < LEADER_LENGTH {
        return Err(MarcError::TruncatedRecord(format!(
            "Record is only {} bytes, leader needs {LEADER_LENGTH}",
            record_bytes.len()
        )));
    }
    let leader = Leader::from_bytes(&record_bytes[..LEADER_LENGTH])?;

    if leader.record_length as usize != record_bytes.len() {
        return Err(MarcError::InvalidRecord(format!(
            "Declared record length {} does not match actual length {}",
            leader.record_length,
            record_bytes.len()
        )));
    }
    if record_bytes.len() > MAX_RECORD_LENGTH {
        return Err(MarcError::InvalidRecord(format!(
            "Record is {} bytes, format maximum is {MAX_RECORD_LENGTH}",
            record_bytes.len()
        )));
    }

    leader.validate_for_reading()?;
    let base_address = leader.data_base_address as usize;
    if base_address > record_bytes.len() {
        return Err(MarcError::InvalidRecord(format!(
            "Base address {base_address} exceeds record length {}",
            record_bytes.len()
        )));
    }

    let directory = &record_bytes[LEADER_LENGTH..base_address];
    if directory.len() % 12 != 1 {
        return Err(MarcError::InvalidRecord(format!(
            "Directory length {} is not a multiple of 12 plus the terminator",
            directory.len()
        )));
    }
    if directory[directory.len() - 1] != FIELD_TERMINATOR {
        return Err(MarcError::InvalidRecord(
            "Directory does not end with the field terminator".to_string(),
        ));
    }

    if record_bytes.last() != Some(&RECORD_TERMINATOR) {
        return Err(MarcError::InvalidRecord(
            "Record does not end with the record terminator".to_string(),
        ));
    }

    Ok(())
}

/// True if [`check_structure`] accepts the bytes.
#[must_use]
pub fn seems_correct(record_bytes: &[u8]) -> bool {
    check_structure(record_bytes).is_ok()
}
