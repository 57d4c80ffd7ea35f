#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # marcgrep
//!
//! A Rust library for reading, writing, validating, and mutating MARC-21
//! bibliographic records in the ISO 2709 binary format, plus a small query
//! language for ad-hoc structural greps over bulk record streams.
//!
//! ## Quick Start
//!
//! ### Reading MARC records
//!
//! ```ignore
//! use marcgrep::MarcReader;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = File::open("records.mrc")?;
//! let mut reader = MarcReader::new(file);
//!
//! while let Some(record) = reader.read_record()? {
//!     if let Some(ppn) = record.control_number() {
//!         println!("{ppn}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### Querying a record stream
//!
//! ```ignore
//! use marcgrep::query::{grep, parse_query, LabelMode};
//! use marcgrep::MarcReader;
//! use std::fs::File;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let query = parse_query(r#"if "100a" exists extract "245a""#)?;
//! let mut reader = MarcReader::new(File::open("records.mrc")?);
//! let stats = grep(
//!     &mut reader,
//!     &query,
//!     LabelMode::MatchedFieldOrSubfield,
//!     &mut std::io::stdout(),
//! )?;
//! eprintln!("Matched {} of {} record(s).", stats.matched, stats.records);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`leader`] — the fixed 24-byte record header codec
//! - [`directory`] — the 12-byte field descriptor codec
//! - [`subfields`] — the delimiter-based mini-format inside data fields
//! - [`record`] — [`Record`]/[`Field`] model and mutation operations
//! - [`reader`] — streaming ISO 2709 reader
//! - [`writer`] — record composition and streaming writer
//! - [`validation`] — structural checks over raw record bytes
//! - [`query`] — the marc_grep query language and evaluator
//! - [`error`] — error types

pub mod directory;
pub mod error;
pub mod leader;
pub mod query;
pub mod reader;
pub mod record;
pub mod subfields;
pub mod validation;
pub mod writer;

pub use directory::DirectoryEntry;
pub use error::{MarcError, Result};
pub use leader::Leader;
pub use reader::MarcReader;
pub use record::{Field, Record};
pub use subfields::{Subfield, Subfields};
pub use validation::{check_structure, seems_correct};
pub use writer::{compose, MarcWriter};
