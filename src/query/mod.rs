//! The marc_grep query language: grammar, parser, and streaming evaluator.
//!
//! A query optionally pins a slice of the serialized leader to a literal,
//! then either lists fields/subfields to extract or pairs conditions with
//! extractions:
//!
//! ```text
//! query          := [ "leader[" uint ["-" uint] "]=" string ] simple_query
//! simple_query   := field_list | cond_ref ("," cond_ref)*
//! field_list     := field_or_subfield (":" field_or_subfield)*
//! cond_ref       := "if" condition "extract" (field_or_subfield | "*")
//! condition      := field_or_subfield comp_op regex
//!                 | field_or_subfield "exists"
//!                 | field_or_subfield "is_missing"
//! comp_op        := "==" | "!=" | "===" | "!=="
//! ```
//!
//! A field-or-subfield reference is a 3-character tag optionally followed
//! by subfield codes: `"245"` names a whole field, `"245ab"` the `a` and
//! `b` subfields. `==`/`!=` compare across all occurrences of a tag in the
//! record; `===`/`!==` compare within each occurrence separately and
//! extract per occurrence.
//!
//! Patterns are compiled to [`regex::Regex`] once at parse time and stored
//! in the AST; evaluation holds no mutable state beyond counters, so a
//! parsed [`Query`] can be reused across records (and threads) freely.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{Condition, FieldRef, LeaderCondition, Query, QueryPair};
pub use eval::{evaluate_record, grep, ExtractedValue, GrepStats, LabelMode};
pub use lexer::{tokenize, Token};
pub use parser::{parse_query, QueryError};
