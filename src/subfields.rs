//! Subfield parsing and manipulation for MARC data fields.
//!
//! A data field's content is a mini-format of its own: two indicator bytes
//! followed by zero or more subfield groups, each introduced by the subfield
//! delimiter (0x1F), a one-byte code, and a value running to the next
//! delimiter or the end of the field.
//!
//! Subfields are stored in original input order. A code may repeat;
//! `first_value` returns the value of the first subfield carrying the code
//! as it appears in the field, and serialization re-emits subfields exactly
//! as they were read, so whole-record round trips are byte-exact.

use crate::error::{MarcError, Result};
use crate::record::SUBFIELD_DELIMITER;
use memchr::memchr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Sentinel indicator value for fields too short to carry indicators.
pub const NULL_INDICATOR: char = '\0';

/// A single (code, value) subfield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfield {
    /// Subfield code (single character).
    pub code: char,
    /// Subfield value. Never empty in a well-formed field.
    pub value: String,
}

/// The parsed content of one data field: indicators plus subfields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subfields {
    /// First indicator, or [`NULL_INDICATOR`] if the field had none.
    pub indicator1: char,
    /// Second indicator, or [`NULL_INDICATOR`] if the field had none.
    pub indicator2: char,
    /// Subfields in original input order. `SmallVec` keeps typical fields
    /// (4 or fewer subfields) inline without allocation.
    subfields: SmallVec<[Subfield; 4]>,
}

impl Subfields {
    /// Create an empty subfield set with the given indicators.
    #[must_use]
    pub fn new(indicator1: char, indicator2: char) -> Self {
        Subfields {
            indicator1,
            indicator2,
            subfields: SmallVec::new(),
        }
    }

    /// Parse a data field's content (without its trailing field terminator).
    ///
    /// Fields shorter than 3 bytes yield [`NULL_INDICATOR`] indicators and
    /// no subfields.
    ///
    /// # Errors
    ///
    /// Returns an error on a missing subfield delimiter, a delimiter with
    /// nothing after it, an empty subfield value, or a value that is not
    /// valid UTF-8. Rejecting non-UTF-8 content keeps the mutation API
    /// lossless: a value never changes length behind the caller's back.
    pub fn parse(field_bytes: &[u8]) -> Result<Self> {
        if field_bytes.len() < 3 {
            return Ok(Subfields::new(NULL_INDICATOR, NULL_INDICATOR));
        }

        let mut parsed = Subfields::new(field_bytes[0] as char, field_bytes[1] as char);

        let mut rest = &field_bytes[2..];
        while !rest.is_empty() {
            if rest[0] != SUBFIELD_DELIMITER {
                return Err(MarcError::InvalidField(
                    "Expected subfield delimiter".to_string(),
                ));
            }
            if rest.len() < 2 {
                return Err(MarcError::InvalidField(
                    "Subfield delimiter with nothing after it".to_string(),
                ));
            }
            let code = rest[1] as char;
            let value_bytes = &rest[2..];
            let value_end = memchr(SUBFIELD_DELIMITER, value_bytes).unwrap_or(value_bytes.len());
            if value_end == 0 {
                return Err(MarcError::InvalidField(format!(
                    "Empty value for subfield '{code}'"
                )));
            }
            let value = std::str::from_utf8(&value_bytes[..value_end]).map_err(|_| {
                MarcError::InvalidField(format!("Value of subfield '{code}' is not valid UTF-8"))
            })?;
            parsed.subfields.push(Subfield {
                code,
                value: value.to_string(),
            });
            rest = &value_bytes[value_end..];
        }

        Ok(parsed)
    }

    /// Serialize back to field content: the two indicators followed by all
    /// subfields in stored order. Fields parsed with sentinel indicators
    /// serialize to an empty buffer.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        if self.indicator1 == NULL_INDICATOR && self.indicator2 == NULL_INDICATOR {
            return Vec::new();
        }
        let mut bytes = Vec::new();
        bytes.push(self.indicator1 as u8);
        bytes.push(self.indicator2 as u8);
        for subfield in &self.subfields {
            bytes.push(SUBFIELD_DELIMITER);
            bytes.push(subfield.code as u8);
            bytes.extend_from_slice(subfield.value.as_bytes());
        }
        bytes
    }

    /// Number of subfields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subfields.len()
    }

    /// True if there are no subfields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subfields.is_empty()
    }

    /// Iterate over all subfields in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &Subfield> {
        self.subfields.iter()
    }

    /// True if any subfield carries the given code.
    #[must_use]
    pub fn has_subfield(&self, code: char) -> bool {
        self.subfields.iter().any(|subfield| subfield.code == code)
    }

    /// True if any subfield carries the given code with exactly this value.
    #[must_use]
    pub fn has_subfield_with_value(&self, code: char, value: &str) -> bool {
        self.subfields
            .iter()
            .any(|subfield| subfield.code == code && subfield.value == value)
    }

    /// Value of the first subfield with the given code, in input order.
    #[must_use]
    pub fn first_value(&self, code: char) -> Option<&str> {
        self.subfields
            .iter()
            .find(|subfield| subfield.code == code)
            .map(|subfield| subfield.value.as_str())
    }

    /// Iterate over all values for one code, in input order.
    pub fn values(&self, code: char) -> impl Iterator<Item = &str> {
        self.subfields
            .iter()
            .filter(move |subfield| subfield.code == code)
            .map(|subfield| subfield.value.as_str())
    }

    /// Append a subfield.
    pub fn add(&mut self, code: char, value: impl Into<String>) {
        self.subfields.push(Subfield {
            code,
            value: value.into(),
        });
    }

    /// Replace the first occurrence of `old` under `code` with `new`.
    ///
    /// Returns false when no subfield with that code and value exists.
    pub fn replace(&mut self, code: char, old: &str, new: &str) -> bool {
        match self
            .subfields
            .iter_mut()
            .find(|subfield| subfield.code == code && subfield.value == old)
        {
            Some(subfield) => {
                subfield.value = new.to_string();
                true
            },
            None => false,
        }
    }

    /// Remove all subfields with the given code. Returns how many were
    /// removed.
    pub fn erase(&mut self, code: char) -> usize {
        let before = self.subfields.len();
        self.subfields.retain(|subfield| subfield.code != code);
        before - self.subfields.len()
    }

    /// Remove the first subfield with the given code and value. Returns
    /// false when none exists.
    pub fn erase_value(&mut self, code: char, value: &str) -> bool {
        match self
            .subfields
            .iter()
            .position(|subfield| subfield.code == code && subfield.value == value)
        {
            Some(index) => {
                self.subfields.remove(index);
                true
            },
            None => false,
        }
    }
}
