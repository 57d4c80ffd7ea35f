//! Tokenizer for the marc_grep query language.
//!
//! A hand-rolled single-pass scanner. Operators use maximal munch so that
//! `===` never lexes as `==` `=` and `!==` never as `!=` `=`. Strings are
//! double-quoted with `\"` and `\\` escapes; bare words (letters, digits,
//! `_`, `*`) lex as keywords when they match one, otherwise as strings.

use super::parser::QueryError;

/// One token of the query language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `if`
    If,
    /// `extract`
    Extract,
    /// `exists`
    Exists,
    /// `is_missing`
    IsMissing,
    /// `leader`
    Leader,
    /// A quoted string or bare word: field reference, regex, or literal.
    Str(String),
    /// An unsigned integer (leader offsets).
    Uint(u32),
    /// `==`
    EqualEqual,
    /// `!=`
    NotEqual,
    /// `===`
    TripleEqual,
    /// `!==`
    NotTripleEqual,
    /// `=`
    Equal,
    /// `[`
    OpenBracket,
    /// `]`
    CloseBracket,
    /// `-`
    Dash,
    /// `:`
    Colon,
    /// `,`
    Comma,
    /// `*`
    Star,
}

/// Tokenize a query string.
///
/// # Errors
///
/// Returns an error on an unterminated string, a bad escape, or a
/// character outside the language.
pub fn tokenize(input: &str) -> Result<Vec<Token>, QueryError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            },
            '[' => {
                chars.next();
                tokens.push(Token::OpenBracket);
            },
            ']' => {
                chars.next();
                tokens.push(Token::CloseBracket);
            },
            '-' => {
                chars.next();
                tokens.push(Token::Dash);
            },
            ':' => {
                chars.next();
                tokens.push(Token::Colon);
            },
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            },
            '*' => {
                chars.next();
                tokens.push(Token::Star);
            },
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    if chars.peek() == Some(&'=') {
                        chars.next();
                        tokens.push(Token::TripleEqual);
                    } else {
                        tokens.push(Token::EqualEqual);
                    }
                } else {
                    tokens.push(Token::Equal);
                }
            },
            '!' => {
                chars.next();
                if chars.peek() != Some(&'=') {
                    return Err(QueryError::Syntax("Expected '=' after '!'".to_string()));
                }
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotTripleEqual);
                } else {
                    tokens.push(Token::NotEqual);
                }
            },
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('"') => value.push('"'),
                            Some('\\') => value.push('\\'),
                            Some(other) => {
                                // Regexes carry their own escapes; pass
                                // unknown escapes through verbatim.
                                value.push('\\');
                                value.push(other);
                            },
                            None => {
                                return Err(QueryError::Syntax(
                                    "Unterminated string".to_string(),
                                ));
                            },
                        },
                        Some(other) => value.push(other),
                        None => {
                            return Err(QueryError::Syntax("Unterminated string".to_string()));
                        },
                    }
                }
                tokens.push(Token::Str(value));
            },
            c if c.is_ascii_digit() => {
                let mut number = 0u32;
                while let Some(&digit) = chars.peek() {
                    match digit.to_digit(10) {
                        Some(d) => {
                            number = number
                                .checked_mul(10)
                                .and_then(|n| n.checked_add(d))
                                .ok_or_else(|| {
                                    QueryError::Syntax("Integer overflow".to_string())
                                })?;
                            chars.next();
                        },
                        None => break,
                    }
                }
                tokens.push(Token::Uint(number));
            },
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                while let Some(&wc) = chars.peek() {
                    if wc.is_ascii_alphanumeric() || wc == '_' {
                        word.push(wc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(match word.as_str() {
                    "if" => Token::If,
                    "extract" => Token::Extract,
                    "exists" => Token::Exists,
                    "is_missing" => Token::IsMissing,
                    "leader" => Token::Leader,
                    _ => Token::Str(word),
                });
            },
            other => {
                return Err(QueryError::Syntax(format!(
                    "Unexpected character '{other}' in query"
                )));
            },
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_field_list() {
        let tokens = tokenize("\"245a\":\"100\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Str("245a".to_string()),
                Token::Colon,
                Token::Str("100".to_string()),
            ]
        );
    }

    #[test]
    fn test_tokenize_cond_ref() {
        let tokens = tokenize("if \"100a\" exists extract \"245a\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::If,
                Token::Str("100a".to_string()),
                Token::Exists,
                Token::Extract,
                Token::Str("245a".to_string()),
            ]
        );
    }

    #[test]
    fn test_maximal_munch_operators() {
        assert_eq!(
            tokenize("=== == = !== !=").unwrap(),
            vec![
                Token::TripleEqual,
                Token::EqualEqual,
                Token::Equal,
                Token::NotTripleEqual,
                Token::NotEqual,
            ]
        );
    }

    #[test]
    fn test_tokenize_leader_condition() {
        let tokens = tokenize("leader[5-6]=\"ab\"").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Leader,
                Token::OpenBracket,
                Token::Uint(5),
                Token::Dash,
                Token::Uint(6),
                Token::CloseBracket,
                Token::Equal,
                Token::Str("ab".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\"b" "re\d+""#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Str("a\"b".to_string()),
                Token::Str(r"re\d+".to_string()),
            ]
        );
    }

    #[test]
    fn test_keywords_and_star() {
        assert_eq!(
            tokenize("is_missing *").unwrap(),
            vec![Token::IsMissing, Token::Star]
        );
    }

    #[test]
    fn test_unterminated_string() {
        assert!(tokenize("\"abc").is_err());
    }

    #[test]
    fn test_lone_bang() {
        assert!(tokenize("! =").is_err());
    }
}
