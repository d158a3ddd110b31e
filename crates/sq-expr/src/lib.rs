#![forbid(unsafe_code)]

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The capability every query-tree node implements: a node checks its own
/// immediate shape on demand, never at construction, so a tree can be
/// assembled incrementally and certified as a whole.
pub trait Expression {
    type Error: std::error::Error + Send + Sync + 'static;

    fn validate(&self) -> Result<(), Self::Error>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidExpressionError {
    #[error("column name cannot be empty")]
    EmptyColumnName,
    #[error("column name '{name}' is not a valid column reference")]
    InvalidColumnName { name: String },
    #[error("alias cannot be empty")]
    EmptyAlias,
    #[error("alias '{alias}' is not a valid alias")]
    InvalidAlias { alias: String },
}

// An identifier with optional dotted/colon segments, optionally subscripted
// with a bracketed key: `release`, `span.duration`, `tags[transaction]`.
static COLUMN_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<base>[a-zA-Z](?:\w|[.:])*)(?:\[(?P<key>[a-zA-Z0-9_.:@-]+)\])?$")
        .expect("column name pattern is a valid regex")
});

static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z](?:\w|\.)*$").expect("alias pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    name: String,
}

impl Column {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The part of a subscripted name before the bracket, e.g. `tags` for
    /// `tags[transaction]`. `None` when the name is not subscripted or does
    /// not match the column pattern at all.
    #[must_use]
    pub fn subscriptable(&self) -> Option<&str> {
        let captures = COLUMN_NAME_RE.captures(&self.name)?;
        captures.name("key")?;
        captures.name("base").map(|m| m.as_str())
    }

    /// The bracketed key of a subscripted name, e.g. `transaction` for
    /// `tags[transaction]`.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        COLUMN_NAME_RE
            .captures(&self.name)
            .and_then(|captures| captures.name("key"))
            .map(|m| m.as_str())
    }
}

impl Expression for Column {
    type Error = InvalidExpressionError;

    fn validate(&self) -> Result<(), InvalidExpressionError> {
        if self.name.is_empty() {
            return Err(InvalidExpressionError::EmptyColumnName);
        }
        if !COLUMN_NAME_RE.is_match(&self.name) {
            return Err(InvalidExpressionError::InvalidColumnName {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AliasedExpression {
    exp: Column,
    #[serde(default)]
    alias: Option<String>,
}

impl AliasedExpression {
    #[must_use]
    pub fn new(exp: Column, alias: Option<String>) -> Self {
        Self { exp, alias }
    }

    #[must_use]
    pub fn exp(&self) -> &Column {
        &self.exp
    }

    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl Expression for AliasedExpression {
    type Error = InvalidExpressionError;

    fn validate(&self) -> Result<(), InvalidExpressionError> {
        self.exp.validate()?;
        if let Some(alias) = &self.alias {
            if alias.is_empty() {
                return Err(InvalidExpressionError::EmptyAlias);
            }
            if !ALIAS_RE.is_match(alias) {
                return Err(InvalidExpressionError::InvalidAlias {
                    alias: alias.clone(),
                });
            }
        }
        Ok(())
    }
}

/// A grouping key: either a bare column or an aliased one. The only shapes
/// accepted in a `groupby` sequence anywhere in the SDK.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GroupKey {
    Column(Column),
    Aliased(AliasedExpression),
}

impl Expression for GroupKey {
    type Error = InvalidExpressionError;

    fn validate(&self) -> Result<(), InvalidExpressionError> {
        match self {
            Self::Column(column) => column.validate(),
            Self::Aliased(aliased) => aliased.validate(),
        }
    }
}

impl From<Column> for GroupKey {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<AliasedExpression> for GroupKey {
    fn from(aliased: AliasedExpression) -> Self {
        Self::Aliased(aliased)
    }
}
