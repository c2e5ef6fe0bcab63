//! Product identifier (ASIN) parsing, cleanup and validation.
//!
//! Callers hand in whatever the user typed: a single identifier, a
//! comma-separated list, or an array. [`normalize`] turns that into a sorted,
//! de-duplicated set and keeps malformed tokens aside so each call site can
//! decide how strict to be via [`ValidationPolicy`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of every product identifier.
pub const IDENTIFIER_LEN: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("no product identifier supplied")]
    Empty,
    #[error("malformed product identifier `{value}`")]
    Malformed { value: String },
    #[error("invalid product identifiers: {}", .values.join(", "))]
    Invalid { values: Vec<String> },
}

/// A validated identifier: exactly ten uppercase ASCII letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let cleaned = strip_whitespace(raw);
        if is_valid_identifier(&cleaned) {
            Ok(Self(cleaned))
        } else {
            Err(IdentifierError::Malformed { value: cleaned })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `^[A-Z0-9]{10}$`
pub fn is_valid_identifier(value: &str) -> bool {
    value.len() == IDENTIFIER_LEN
        && value
            .bytes()
            .all(|byte| byte.is_ascii_uppercase() || byte.is_ascii_digit())
}

/// Raw identifier input as accepted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum IdentifierInput {
    Single(String),
    List(Vec<String>),
}

impl IdentifierInput {
    fn tokens(&self) -> Vec<String> {
        match self {
            IdentifierInput::Single(raw) => strip_whitespace(raw)
                .split(',')
                .map(str::to_string)
                .collect(),
            IdentifierInput::List(values) => values.iter().map(|v| strip_whitespace(v)).collect(),
        }
    }

    /// Non-empty tokens as supplied, duplicates and malformed values included.
    pub fn token_count(&self) -> usize {
        self.tokens().iter().filter(|token| !token.is_empty()).count()
    }
}

impl From<&str> for IdentifierInput {
    fn from(value: &str) -> Self {
        IdentifierInput::Single(value.to_string())
    }
}

impl From<Vec<String>> for IdentifierInput {
    fn from(values: Vec<String>) -> Self {
        IdentifierInput::List(values)
    }
}

/// How a call site treats malformed identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Any malformed identifier fails the whole request.
    Strict,
    /// Malformed identifiers are dropped; the request continues with the rest.
    Lenient,
}

/// Output of [`normalize`]: valid identifiers in sorted order plus one error per rejected token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedIds {
    pub ids: Vec<ProductId>,
    pub errors: Vec<IdentifierError>,
}

impl NormalizedIds {
    /// Number of distinct non-empty tokens, valid or not.
    pub fn requested(&self) -> usize {
        self.ids.len() + self.errors.len()
    }

    pub fn rejected_values(&self) -> Vec<String> {
        self.errors
            .iter()
            .filter_map(|err| match err {
                IdentifierError::Malformed { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Resolve the identifier set under `policy`. An empty result is always an error.
    pub fn apply(self, policy: ValidationPolicy) -> Result<Vec<ProductId>, IdentifierError> {
        let rejected = self.rejected_values();

        if policy == ValidationPolicy::Strict && !rejected.is_empty() {
            return Err(IdentifierError::Invalid { values: rejected });
        }

        if self.ids.is_empty() {
            return Err(if rejected.is_empty() {
                IdentifierError::Empty
            } else {
                IdentifierError::Invalid { values: rejected }
            });
        }

        Ok(self.ids)
    }
}

/// Split, clean and de-duplicate identifier input.
pub fn normalize(input: &IdentifierInput) -> NormalizedIds {
    let mut valid = BTreeSet::new();
    let mut rejected = BTreeSet::new();

    for token in input.tokens() {
        if token.is_empty() {
            continue;
        }
        match ProductId::parse(&token) {
            Ok(id) => {
                valid.insert(id);
            }
            Err(_) => {
                rejected.insert(token);
            }
        }
    }

    NormalizedIds {
        ids: valid.into_iter().collect(),
        errors: rejected
            .into_iter()
            .map(|value| IdentifierError::Malformed { value })
            .collect(),
    }
}

fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}
