//! Core MARC record structures and mutation operations.
//!
//! A [`Record`] is a [`Leader`] plus one ordered sequence of [`Field`]s.
//! Each field pairs a 3-character tag with its raw content bytes (the field
//! terminator is stripped on read and re-added on write). Directory entries
//! and their offsets are *not* stored on the record; the writer derives them
//! from field lengths at serialization time, so mutators cannot leave the
//! offset bookkeeping inconsistent.
//!
//! Tags beginning with `00` are control fields: raw text, no indicators or
//! subfields. All other fields carry two indicator bytes followed by
//! subfield groups; parse them on demand with [`Field::subfields`].

use crate::error::{MarcError, Result};
use crate::leader::Leader;
use crate::subfields::Subfields;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Marks the end of a variable field and of the directory.
pub const FIELD_TERMINATOR: u8 = 0x1E;
/// Introduces a subfield group within a data field.
pub const SUBFIELD_DELIMITER: u8 = 0x1F;
/// Marks the end of a serialized record.
pub const RECORD_TERMINATOR: u8 = 0x1D;

/// Tag of the control-number field (the record's PPN).
pub const CONTROL_NUMBER_TAG: &str = "001";

/// One variable field: a tag and its content bytes.
///
/// Content excludes the trailing field terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field tag (3 characters).
    pub tag: String,
    /// Raw field content. For data fields this is two indicator bytes plus
    /// the subfield groups; for control fields it is plain text.
    pub content: Vec<u8>,
}

impl Field {
    /// Create a field from a tag and raw content bytes.
    pub fn new(tag: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Field {
            tag: tag.into(),
            content: content.into(),
        }
    }

    /// Create a data field from parsed subfields.
    #[must_use]
    pub fn from_subfields(tag: impl Into<String>, subfields: &Subfields) -> Self {
        Field {
            tag: tag.into(),
            content: subfields.serialize(),
        }
    }

    /// True for control fields (tags beginning with "00").
    #[must_use]
    pub fn is_control_field(&self) -> bool {
        self.tag.starts_with("00")
    }

    /// Parse this field's content as indicators plus subfields.
    ///
    /// # Errors
    ///
    /// Returns an error if the subfield structure is malformed. Calling
    /// this on a control field is a caller mistake and will also fail.
    pub fn subfields(&self) -> Result<Subfields> {
        Subfields::parse(&self.content)
    }

    /// Field content as text, with invalid UTF-8 replaced.
    #[must_use]
    pub fn content_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Serialized length of this field, including the field terminator.
    #[must_use]
    pub fn wire_length(&self) -> usize {
        self.content.len() + 1
    }
}

/// A MARC bibliographic record: leader plus ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record leader (24 bytes).
    pub leader: Leader,
    fields: Vec<Field>,
}

impl Record {
    /// Create an empty record with the given leader.
    #[must_use]
    pub fn new(leader: Leader) -> Self {
        Record {
            leader,
            fields: Vec::new(),
        }
    }

    /// Create a record from a leader and an already-ordered field sequence.
    #[must_use]
    pub fn from_fields(leader: Leader, fields: Vec<Field>) -> Self {
        Record { leader, fields }
    }

    /// Number of fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Iterate over all fields in record order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter()
    }

    /// Iterate over all fields with the given tag, in record order.
    pub fn fields_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Field> + 'a {
        self.fields.iter().filter(move |field| field.tag == tag)
    }

    /// First field with the given tag.
    #[must_use]
    pub fn first_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag == tag)
    }

    /// Field at a given index, in record order.
    #[must_use]
    pub fn field_at(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// True if the record has at least one field with the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.first_field(tag).is_some()
    }

    /// The record's control number (content of field "001"), if present
    /// and valid UTF-8.
    #[must_use]
    pub fn control_number(&self) -> Option<&str> {
        self.first_field(CONTROL_NUMBER_TAG)
            .and_then(|field| std::str::from_utf8(&field.content).ok())
    }

    /// Insert a field, keeping fields in ascending-tag order.
    ///
    /// The new field goes before the first existing field whose tag is
    /// greater, i.e. after any existing fields with an equal tag. The
    /// leader's record length grows by `content length + 12 + 1` (directory
    /// entry plus field terminator) and the base address of data by 12.
    ///
    /// Caller contract, not checked at runtime: the record already has a
    /// control-number field, so the new field never becomes field "001"'s
    /// predecessor by accident.
    pub fn insert_field(&mut self, tag: impl Into<String>, content: impl Into<Vec<u8>>) {
        let field = Field::new(tag, content);
        let position = self
            .fields
            .iter()
            .position(|existing| existing.tag.as_str() > field.tag.as_str())
            .unwrap_or(self.fields.len());

        self.leader.record_length += u32::try_from(field.wire_length() + 12).unwrap_or(0);
        self.leader.data_base_address += 12;
        self.fields.insert(position, field);
    }

    /// Replace the content of the field at `index`.
    ///
    /// The leader's record length is adjusted by the size delta. Offsets
    /// need no fixup because they are derived at serialization time.
    ///
    /// # Errors
    ///
    /// Returns an error if `index` is out of bounds.
    pub fn update_field(&mut self, index: usize, new_content: impl Into<Vec<u8>>) -> Result<()> {
        let field_count = self.fields.len();
        let field = self.fields.get_mut(index).ok_or_else(|| {
            MarcError::InvalidRecord(format!(
                "Field index {index} out of bounds (record has {field_count} fields)"
            ))
        })?;

        let new_content = new_content.into();
        let delta = new_content.len() as i64 - field.content.len() as i64;
        field.content = new_content;
        self.leader.record_length =
            u32::try_from(i64::from(self.leader.record_length) + delta).unwrap_or(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_leader() -> Leader {
        Leader::from_bytes(b"00000nam a2200000 i 4500").unwrap()
    }

    fn make_record() -> Record {
        let mut record = Record::new(make_leader());
        record.insert_field("001", b"PPN123".to_vec());
        record.insert_field("100", b"1 \x1faSmith".to_vec());
        record.insert_field("245", b"10\x1faTitle".to_vec());
        record
    }

    #[test]
    fn test_control_number() {
        let record = make_record();
        assert_eq!(record.control_number(), Some("PPN123"));
        assert!(record.first_field("001").unwrap().is_control_field());
        assert!(!record.first_field("245").unwrap().is_control_field());
    }

    #[test]
    fn test_insert_keeps_ascending_tag_order() {
        let mut record = make_record();
        record.insert_field("110", b"2 \x1faCorp".to_vec());
        let tags: Vec<&str> = record.fields().map(|field| field.tag.as_str()).collect();
        assert_eq!(tags, vec!["001", "100", "110", "245"]);

        // equal tags: new field goes after the existing run
        record.insert_field("100", b"1 \x1faJones".to_vec());
        let values: Vec<String> = record
            .fields_by_tag("100")
            .map(|field| field.content_str().into_owned())
            .collect();
        assert_eq!(values[0], "1 \x1faSmith");
        assert_eq!(values[1], "1 \x1faJones");
    }

    #[test]
    fn test_insert_adjusts_leader() {
        let mut record = make_record();
        let length_before = record.leader.record_length;
        let base_before = record.leader.data_base_address;

        let content = b"  \x1faNote".to_vec();
        let content_len = content.len() as u32;
        record.insert_field("500", content);

        assert_eq!(
            record.leader.record_length,
            length_before + content_len + 12 + 1
        );
        assert_eq!(record.leader.data_base_address, base_before + 12);
    }

    #[test]
    fn test_update_field_adjusts_length_by_delta() {
        let mut record = make_record();
        let length_before = record.leader.record_length;
        let index = 2; // the 245
        let old_len = record.field_at(index).unwrap().content.len() as i64;

        record.update_field(index, b"10\x1faLonger title".to_vec()).unwrap();
        let new_len = record.field_at(index).unwrap().content.len() as i64;

        assert_eq!(
            i64::from(record.leader.record_length),
            i64::from(length_before) + (new_len - old_len)
        );
        assert_eq!(
            record.first_field("245").unwrap().content_str(),
            "10\x1faLonger title"
        );
    }

    #[test]
    fn test_update_field_out_of_bounds() {
        let mut record = make_record();
        assert!(record.update_field(99, b"x".to_vec()).is_err());
    }

    #[test]
    fn test_field_from_subfields_roundtrip() {
        let mut subfields = Subfields::new('1', '0');
        subfields.add('a', "Title");
        let field = Field::from_subfields("245", &subfields);
        assert_eq!(field.subfields().unwrap(), subfields);
    }
}
