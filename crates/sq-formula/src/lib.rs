#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use sq_conditions::{ConditionGroup, ConditionNode};
use sq_expr::{Expression, GroupKey};
use sq_timeseries::Timeseries;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidFormulaError {
    #[error("formula operator cannot be empty")]
    EmptyOperator,
    #[error("operator '{operator}' is not supported")]
    UnsupportedOperator { operator: String },
}

/// Arithmetic-semantics violations, e.g. an arity check per operator.
/// Declared for downstream layers that post-process formula trees; nothing
/// in this crate constructs it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidArithmeticError {
    #[error("operator '{operator}' expects {expected} parameters but found {found}")]
    ParameterCount {
        operator: String,
        expected: usize,
        found: usize,
    },
}

/// The closed set of supported arithmetic operators. A [`Formula`] stores
/// the canonical lowercase tag, not the enum member; this catalog exists to
/// define the legal set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    pub const ALL: [Self; 4] = [Self::Plus, Self::Minus, Self::Multiply, Self::Divide];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == tag)
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One operand of a formula: a numeric literal, a metric time-series, or a
/// nested formula. Untagged so literals round-trip as bare JSON numbers and
/// node operands as objects; ill-typed operands arriving from the dynamic
/// boundary are rejected during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormulaParameter {
    Int(i64),
    Float(f64),
    Series(Timeseries),
    Nested(Formula),
}

impl From<i64> for FormulaParameter {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for FormulaParameter {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Timeseries> for FormulaParameter {
    fn from(series: Timeseries) -> Self {
        Self::Series(series)
    }
}

impl From<Formula> for FormulaParameter {
    fn from(formula: Formula) -> Self {
        Self::Nested(formula)
    }
}

/// An arithmetic combination of operands under one operator, with optional
/// filter and grouping metadata.
///
/// A formula is assembled field by field without any checking; `validate`
/// certifies the node's own shape on demand and may be called any number of
/// times. Validation is shallow: nested formulas and timeseries vouch for
/// themselves through their own `validate` implementations, and the typed
/// `filters`/`groupby` sequences were vetted when they were built. All
/// transforms are pure: a setter returns a new formula and never touches
/// the receiver, so sharing a formula across threads needs no locking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    operator: String,
    #[serde(default)]
    parameters: Option<Vec<FormulaParameter>>,
    #[serde(default)]
    filters: Option<ConditionGroup>,
    #[serde(default)]
    groupby: Option<Vec<GroupKey>>,
}

impl Formula {
    #[must_use]
    pub fn new(operator: impl Into<String>, parameters: Option<Vec<FormulaParameter>>) -> Self {
        Self {
            operator: operator.into(),
            parameters,
            filters: None,
            groupby: None,
        }
    }

    #[must_use]
    pub fn with_fields(
        operator: impl Into<String>,
        parameters: Option<Vec<FormulaParameter>>,
        filters: Option<ConditionGroup>,
        groupby: Option<Vec<GroupKey>>,
    ) -> Self {
        Self {
            operator: operator.into(),
            parameters,
            filters,
            groupby,
        }
    }

    #[must_use]
    pub fn operator(&self) -> &str {
        &self.operator
    }

    #[must_use]
    pub fn parameters(&self) -> Option<&[FormulaParameter]> {
        self.parameters.as_deref()
    }

    #[must_use]
    pub fn filters(&self) -> Option<&[ConditionNode]> {
        self.filters.as_deref()
    }

    #[must_use]
    pub fn groupby(&self) -> Option<&[GroupKey]> {
        self.groupby.as_deref()
    }

    #[must_use]
    pub fn set_parameters(&self, parameters: Option<Vec<FormulaParameter>>) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_filters(&self, filters: Option<ConditionGroup>) -> Self {
        Self {
            filters,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_groupby(&self, groupby: Option<Vec<GroupKey>>) -> Self {
        Self {
            groupby,
            ..self.clone()
        }
    }
}

impl Expression for Formula {
    type Error = InvalidFormulaError;

    /// Checks that the stored operator tag names one of the supported
    /// arithmetic operators. Nested operands are not re-validated here;
    /// each node answers for its own shape.
    fn validate(&self) -> Result<(), InvalidFormulaError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(operator = %self.operator, "validating formula");

        if self.operator.is_empty() {
            return Err(InvalidFormulaError::EmptyOperator);
        }
        if ArithmeticOperator::from_tag(&self.operator).is_none() {
            #[cfg(feature = "tracing")]
            tracing::debug!(operator = %self.operator, "rejecting unsupported operator");
            return Err(InvalidFormulaError::UnsupportedOperator {
                operator: self.operator.clone(),
            });
        }
        Ok(())
    }
}
