//! Recursive-descent parser for the marc_grep query language.
//!
//! The parser consumes the token stream produced by [`super::lexer`] and
//! builds a [`Query`]. Semantic checks run during the parse and abort it:
//! a failed check returns an error, never a partial query.

use super::ast::{Condition, FieldRef, LeaderCondition, Query, QueryPair};
use super::lexer::{tokenize, Token};
use crate::leader::LEADER_LENGTH;
use regex::Regex;
use thiserror::Error;

/// Error type for query tokenization and parsing.
///
/// Recoverable at the CLI boundary: the caller reports the message and
/// exits nonzero without touching any already-read record state.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Malformed token stream or unexpected token.
    #[error("Query syntax error: {0}")]
    Syntax(String),

    /// A structurally valid query that violates a semantic rule.
    #[error("Query semantic error: {0}")]
    Semantic(String),

    /// A comparison pattern that does not compile.
    #[error("Bad pattern in query: {0}")]
    BadPattern(#[from] regex::Error),
}

/// Parse a query string into a [`Query`].
///
/// # Errors
///
/// Returns a [`QueryError`] describing the first problem found.
pub fn parse_query(input: &str) -> Result<Query, QueryError> {
    let tokens = tokenize(input)?;
    Parser::new(tokens).parse()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token, context: &str) -> Result<(), QueryError> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            Some(token) => Err(QueryError::Syntax(format!(
                "Expected {expected:?} {context}, found {token:?}"
            ))),
            None => Err(QueryError::Syntax(format!(
                "Expected {expected:?} {context}, found end of query"
            ))),
        }
    }

    fn expect_string(&mut self, context: &str) -> Result<String, QueryError> {
        match self.next() {
            Some(Token::Str(value)) => Ok(value),
            Some(token) => Err(QueryError::Syntax(format!(
                "Expected a string {context}, found {token:?}"
            ))),
            None => Err(QueryError::Syntax(format!(
                "Expected a string {context}, found end of query"
            ))),
        }
    }

    fn expect_uint(&mut self, context: &str) -> Result<u32, QueryError> {
        match self.next() {
            Some(Token::Uint(value)) => Ok(value),
            Some(token) => Err(QueryError::Syntax(format!(
                "Expected an unsigned integer {context}, found {token:?}"
            ))),
            None => Err(QueryError::Syntax(format!(
                "Expected an unsigned integer {context}, found end of query"
            ))),
        }
    }

    fn parse(mut self) -> Result<Query, QueryError> {
        let leader_condition = if self.peek() == Some(&Token::Leader) {
            Some(self.parse_leader_condition()?)
        } else {
            None
        };

        let pairs = if self.peek() == Some(&Token::If) {
            self.parse_cond_refs()?
        } else {
            self.parse_field_list()?
        };

        if let Some(extra) = self.peek() {
            return Err(QueryError::Syntax(format!(
                "Trailing input after query: {extra:?}"
            )));
        }
        Ok(Query {
            leader_condition,
            pairs,
        })
    }

    fn parse_leader_condition(&mut self) -> Result<LeaderCondition, QueryError> {
        self.expect(&Token::Leader, "at start of leader condition")?;
        self.expect(&Token::OpenBracket, "after 'leader'")?;
        let start = self.expect_uint("as leader range start")? as usize;
        let end = if self.peek() == Some(&Token::Dash) {
            self.next();
            self.expect_uint("as leader range end")? as usize
        } else {
            start
        };
        self.expect(&Token::CloseBracket, "after leader range")?;
        self.expect(&Token::Equal, "after ']'")?;
        let literal = self.expect_string("as leader literal")?;

        if end >= LEADER_LENGTH {
            return Err(QueryError::Semantic(format!(
                "Leader offset {end} exceeds leader bound {}",
                LEADER_LENGTH - 1
            )));
        }
        if end < start {
            return Err(QueryError::Semantic(format!(
                "Leader range end {end} is before start {start}"
            )));
        }
        let span = end - start + 1;
        if literal.len() != span {
            return Err(QueryError::Semantic(format!(
                "Leader literal \"{literal}\" has length {}, range [{start}-{end}] spans {span}",
                literal.len()
            )));
        }

        Ok(LeaderCondition {
            start,
            end,
            literal,
        })
    }

    fn parse_field_list(&mut self) -> Result<Vec<QueryPair>, QueryError> {
        let mut pairs = Vec::new();
        loop {
            let field_ref = self.parse_field_ref("in field list")?;
            pairs.push(QueryPair {
                condition: Condition::NoComparison,
                cond_ref: field_ref.clone(),
                extract: field_ref,
            });
            if self.peek() == Some(&Token::Colon) {
                self.next();
            } else {
                break;
            }
        }
        Ok(pairs)
    }

    fn parse_cond_refs(&mut self) -> Result<Vec<QueryPair>, QueryError> {
        let mut pairs = Vec::new();
        loop {
            pairs.push(self.parse_cond_ref()?);
            if self.peek() == Some(&Token::Comma) {
                self.next();
            } else {
                break;
            }
        }
        Ok(pairs)
    }

    fn parse_cond_ref(&mut self) -> Result<QueryPair, QueryError> {
        self.expect(&Token::If, "at start of condition")?;
        let cond_ref = self.parse_field_ref("in condition")?;

        let (condition, per_occurrence) = match self.next() {
            Some(Token::Exists) => (Condition::Exists, false),
            Some(Token::IsMissing) => (Condition::IsMissing, false),
            Some(Token::EqualEqual) => {
                (Condition::Matches(self.parse_pattern()?), false)
            },
            Some(Token::NotEqual) => {
                (Condition::NotMatches(self.parse_pattern()?), false)
            },
            Some(Token::TripleEqual) => {
                (Condition::SingleFieldMatches(self.parse_pattern()?), true)
            },
            Some(Token::NotTripleEqual) => {
                (Condition::SingleFieldNotMatches(self.parse_pattern()?), true)
            },
            Some(token) => {
                return Err(QueryError::Syntax(format!(
                    "Expected a comparison operator, 'exists' or 'is_missing', found {token:?}"
                )));
            },
            None => {
                return Err(QueryError::Syntax(
                    "Expected a comparison after the condition reference".to_string(),
                ));
            },
        };

        if per_occurrence && !cond_ref.has_codes() {
            return Err(QueryError::Semantic(format!(
                "Single-field comparison needs a subfield reference, \"{}\" names a whole field",
                cond_ref.tag
            )));
        }

        self.expect(&Token::Extract, "after the condition")?;
        let extract = self.parse_field_ref("after 'extract'")?;

        if per_occurrence && extract.tag != cond_ref.tag {
            return Err(QueryError::Semantic(format!(
                "Single-field comparison on tag {} cannot extract from tag {}",
                cond_ref.tag, extract.tag
            )));
        }

        Ok(QueryPair {
            condition,
            cond_ref,
            extract,
        })
    }

    fn parse_pattern(&mut self) -> Result<Regex, QueryError> {
        let pattern = self.expect_string("as comparison pattern")?;
        Ok(Regex::new(&pattern)?)
    }

    fn parse_field_ref(&mut self, context: &str) -> Result<FieldRef, QueryError> {
        let reference = match self.next() {
            Some(Token::Star) => {
                return Ok(FieldRef {
                    tag: "*".to_string(),
                    codes: Vec::new(),
                });
            },
            Some(Token::Str(value)) => value,
            Some(token) => {
                return Err(QueryError::Syntax(format!(
                    "Expected a field reference {context}, found {token:?}"
                )));
            },
            None => {
                return Err(QueryError::Syntax(format!(
                    "Expected a field reference {context}, found end of query"
                )));
            },
        };

        if reference == "*" {
            return Ok(FieldRef {
                tag: "*".to_string(),
                codes: Vec::new(),
            });
        }
        if reference.len() < 3 {
            return Err(QueryError::Semantic(format!(
                "Field reference \"{reference}\" is shorter than a 3-character tag"
            )));
        }
        let (tag, codes) = reference.split_at(3);
        Ok(FieldRef {
            tag: tag.to_string(),
            codes: codes.chars().collect(),
        })
    }
}
