//! Glob-style key patterns
//!
//! `*` matches any run of characters (including none), `?` matches exactly
//! one character and `\` makes the next character literal.

use crate::error::{EmberError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Char(char),
    One,
    Star,
}

/// Compiled key pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Compile a pattern; empty patterns and a trailing lone `\` are rejected
    pub fn new(source: &str) -> Result<Self> {
        if source.is_empty() {
            return Err(EmberError::InvalidPattern("pattern is empty".to_string()));
        }

        let mut tokens = Vec::with_capacity(source.len());
        let mut chars = source.chars();
        while let Some(c) = chars.next() {
            let token = match c {
                '*' => Token::Star,
                '?' => Token::One,
                '\\' => match chars.next() {
                    Some(escaped) => Token::Char(escaped),
                    None => {
                        return Err(EmberError::InvalidPattern(format!(
                            "dangling escape at end of {:?}",
                            source
                        )))
                    }
                },
                other => Token::Char(other),
            };
            // Adjacent stars are redundant
            if token == Token::Star && tokens.last() == Some(&Token::Star) {
                continue;
            }
            tokens.push(token);
        }

        Ok(Self {
            source: source.to_string(),
            tokens,
        })
    }

    /// Pattern that matches every key
    pub fn all() -> Self {
        Self {
            source: "*".to_string(),
            tokens: vec![Token::Star],
        }
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True for `*`
    pub fn matches_all(&self) -> bool {
        self.tokens == [Token::Star]
    }

    /// Literal characters before the first wildcard. Every matching key
    /// starts with this prefix.
    pub fn literal_prefix(&self) -> String {
        self.tokens
            .iter()
            .map_while(|token| match token {
                Token::Char(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    /// True if the pattern has no wildcards at all
    pub fn is_literal(&self) -> bool {
        self.tokens.iter().all(|t| matches!(t, Token::Char(_)))
    }

    /// Test a key against the pattern
    pub fn matches(&self, key: &str) -> bool {
        if self.matches_all() {
            return true;
        }

        let text: Vec<char> = key.chars().collect();
        let (mut t, mut p) = (0usize, 0usize);
        // Last star seen: (token index, text index it is currently covering up to)
        let mut backtrack: Option<(usize, usize)> = None;

        while t < text.len() {
            match self.tokens.get(p) {
                Some(Token::Star) => {
                    backtrack = Some((p, t));
                    p += 1;
                    continue;
                }
                Some(Token::One) => {
                    p += 1;
                    t += 1;
                    continue;
                }
                Some(Token::Char(c)) if *c == text[t] => {
                    p += 1;
                    t += 1;
                    continue;
                }
                _ => {}
            }

            match backtrack {
                Some((star, covered)) => {
                    // Let the star swallow one more character and retry
                    p = star + 1;
                    t = covered + 1;
                    backtrack = Some((star, covered + 1));
                }
                None => return false,
            }
        }

        self.tokens[p..].iter().all(|t| *t == Token::Star)
    }
}
