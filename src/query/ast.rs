//! Abstract syntax tree for the marc_grep query language.
//!
//! The AST is built once per program invocation and evaluated read-only
//! against every record in the stream. Comparison patterns are compiled
//! [`regex::Regex`] values stored in the condition variants; `Regex` is
//! `Send + Sync`, so a `Query` can be shared across threads.

use regex::Regex;

/// A reference to a whole field or to specific subfields of one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    /// 3-character tag, or `"*"` for every tag in the record.
    pub tag: String,
    /// Subfield codes; empty means the whole field.
    pub codes: Vec<char>,
}

impl FieldRef {
    /// True if this reference is the `*` wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.tag == "*"
    }

    /// True if this reference names specific subfields.
    #[must_use]
    pub fn has_codes(&self) -> bool {
        !self.codes.is_empty()
    }
}

/// A literal match against a byte range of the serialized leader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderCondition {
    /// First leader byte offset (inclusive), within [0, 23].
    pub start: usize,
    /// Last leader byte offset (inclusive), within [0, 23].
    pub end: usize,
    /// Literal the slice must equal; its length equals the range's span.
    pub literal: String,
}

/// The condition kind of one query pair.
///
/// Comparison variants carry their compiled pattern. `Matches`/`NotMatches`
/// test across all occurrences of the condition tag in the record;
/// `SingleFieldMatches`/`SingleFieldNotMatches` test within each occurrence
/// separately.
#[derive(Debug, Clone)]
pub enum Condition {
    /// No condition: the extraction tag must merely be present.
    NoComparison,
    /// `==`: pattern matches in any occurrence of the tag.
    Matches(Regex),
    /// `!=`: pattern matches in no occurrence of the tag.
    NotMatches(Regex),
    /// `===`: per-occurrence match, extract from matching occurrences.
    SingleFieldMatches(Regex),
    /// `!==`: per-occurrence, extract where the comparison subfield is
    /// absent or fails to match.
    SingleFieldNotMatches(Regex),
    /// `exists`: the tag (optionally carrying a subfield code) is present.
    Exists,
    /// `is_missing`: the tag (optionally with a subfield code) is absent.
    IsMissing,
}

/// One (condition, extraction) pair of the query.
#[derive(Debug, Clone)]
pub struct QueryPair {
    /// The condition kind.
    pub condition: Condition,
    /// The field reference the condition tests.
    pub cond_ref: FieldRef,
    /// The field reference to extract when the condition holds.
    pub extract: FieldRef,
}

/// A parsed query: an optional leader condition plus ordered pairs.
#[derive(Debug, Clone)]
pub struct Query {
    /// Leader slice literal match; records failing it are skipped outright.
    pub leader_condition: Option<LeaderCondition>,
    /// The (condition, extraction) pairs, in query order.
    pub pairs: Vec<QueryPair>,
}
