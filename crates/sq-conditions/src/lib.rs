#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use sq_expr::{Column, Expression, InvalidExpressionError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidConditionError {
    #[error(transparent)]
    Lhs(#[from] InvalidExpressionError),
    #[error("operator '{op}' requires a list right-hand side but found {found}")]
    ScalarRhsForMembershipOp { op: Op, found: ConditionValue },
    #[error("operator '{op}' requires a scalar right-hand side but found a list")]
    ListRhsForScalarOp { op: Op },
    #[error("boolean condition requires at least 2 conditions but found {found}")]
    TooFewConditions { found: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
    In,
    NotIn,
}

impl Op {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
        }
    }

    /// Membership operators compare against a list of values rather than a
    /// single scalar.
    #[must_use]
    pub fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BooleanOp {
    And,
    Or,
}

impl fmt::Display for BooleanOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
        }
    }
}

/// Right-hand side of a condition: a scalar for comparison operators, a
/// list of scalars for membership operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ConditionValue>),
}

impl ConditionValue {
    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "'{v}'"),
            Self::List(values) => {
                write!(f, "[")?;
                for (pos, value) in values.iter().enumerate() {
                    if pos > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    lhs: Column,
    op: Op,
    rhs: ConditionValue,
}

impl Condition {
    #[must_use]
    pub fn new(lhs: Column, op: Op, rhs: impl Into<ConditionValue>) -> Self {
        Self {
            lhs,
            op,
            rhs: rhs.into(),
        }
    }

    #[must_use]
    pub fn lhs(&self) -> &Column {
        &self.lhs
    }

    #[must_use]
    pub fn op(&self) -> Op {
        self.op
    }

    #[must_use]
    pub fn rhs(&self) -> &ConditionValue {
        &self.rhs
    }
}

impl Expression for Condition {
    type Error = InvalidConditionError;

    fn validate(&self) -> Result<(), InvalidConditionError> {
        self.lhs.validate()?;
        if self.op.is_membership() && !self.rhs.is_list() {
            return Err(InvalidConditionError::ScalarRhsForMembershipOp {
                op: self.op,
                found: self.rhs.clone(),
            });
        }
        if !self.op.is_membership() && self.rhs.is_list() {
            return Err(InvalidConditionError::ListRhsForScalarOp { op: self.op });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanCondition {
    op: BooleanOp,
    conditions: ConditionGroup,
}

impl BooleanCondition {
    #[must_use]
    pub fn new(op: BooleanOp, conditions: ConditionGroup) -> Self {
        Self { op, conditions }
    }

    #[must_use]
    pub fn and(conditions: ConditionGroup) -> Self {
        Self::new(BooleanOp::And, conditions)
    }

    #[must_use]
    pub fn or(conditions: ConditionGroup) -> Self {
        Self::new(BooleanOp::Or, conditions)
    }

    #[must_use]
    pub fn op(&self) -> BooleanOp {
        self.op
    }

    #[must_use]
    pub fn conditions(&self) -> &[ConditionNode] {
        &self.conditions
    }
}

impl Expression for BooleanCondition {
    type Error = InvalidConditionError;

    fn validate(&self) -> Result<(), InvalidConditionError> {
        if self.conditions.len() < 2 {
            return Err(InvalidConditionError::TooFewConditions {
                found: self.conditions.len(),
            });
        }
        for condition in &self.conditions {
            condition.validate()?;
        }
        Ok(())
    }
}

/// A single entry of a condition group: a simple comparison or a nested
/// boolean combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionNode {
    Simple(Condition),
    Boolean(BooleanCondition),
}

pub type ConditionGroup = Vec<ConditionNode>;

impl Expression for ConditionNode {
    type Error = InvalidConditionError;

    fn validate(&self) -> Result<(), InvalidConditionError> {
        match self {
            Self::Simple(condition) => condition.validate(),
            Self::Boolean(boolean) => boolean.validate(),
        }
    }
}

impl From<Condition> for ConditionNode {
    fn from(condition: Condition) -> Self {
        Self::Simple(condition)
    }
}

impl From<BooleanCondition> for ConditionNode {
    fn from(boolean: BooleanCondition) -> Self {
        Self::Boolean(boolean)
    }
}

#[cfg(test)]
mod tests {
    use sq_expr::{Column, Expression};

    use super::{
        BooleanCondition, Condition, ConditionNode, ConditionValue, InvalidConditionError, Op,
    };

    #[test]
    fn scalar_comparison_validates() {
        let condition = Condition::new(Column::new("environment"), Op::Eq, "production");
        condition.validate().expect("scalar rhs for = is fine");
    }

    #[test]
    fn membership_op_requires_list_rhs() {
        let condition = Condition::new(Column::new("release"), Op::In, "1.0.0");
        let err = condition.validate().expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "operator 'IN' requires a list right-hand side but found '1.0.0'"
        );
    }

    #[test]
    fn scalar_op_rejects_list_rhs() {
        let rhs = ConditionValue::List(vec![1_i64.into(), 2_i64.into()]);
        let condition = Condition::new(Column::new("span.duration"), Op::Gt, rhs);
        let err = condition.validate().expect_err("must fail");
        assert!(matches!(
            err,
            InvalidConditionError::ListRhsForScalarOp { op: Op::Gt }
        ));
    }

    #[test]
    fn membership_with_list_rhs_validates() {
        let rhs = ConditionValue::List(vec!["prod".into(), "staging".into()]);
        Condition::new(Column::new("environment"), Op::NotIn, rhs)
            .validate()
            .expect("list rhs for NOT IN is fine");
    }

    #[test]
    fn condition_with_invalid_lhs_surfaces_column_error() {
        let condition = Condition::new(Column::new("1bad"), Op::Eq, 1_i64);
        let err = condition.validate().expect_err("must fail");
        assert!(err.to_string().contains("1bad"));
    }

    #[test]
    fn boolean_condition_requires_two_children() {
        let lone: ConditionNode =
            Condition::new(Column::new("environment"), Op::Eq, "prod").into();
        let boolean = BooleanCondition::and(vec![lone]);
        let err = boolean.validate().expect_err("must fail");
        assert_eq!(
            err,
            InvalidConditionError::TooFewConditions { found: 1 }
        );
    }

    #[test]
    fn nested_boolean_conditions_validate_recursively() {
        let inner = BooleanCondition::or(vec![
            Condition::new(Column::new("environment"), Op::Eq, "prod").into(),
            Condition::new(Column::new("environment"), Op::Eq, "staging").into(),
        ]);
        let outer = BooleanCondition::and(vec![
            inner.into(),
            Condition::new(Column::new("release"), Op::Neq, "1.0.0").into(),
        ]);
        outer.validate().expect("nested group is well-formed");

        let broken = BooleanCondition::and(vec![
            BooleanCondition::or(vec![]).into(),
            Condition::new(Column::new("release"), Op::Eq, "1.0.0").into(),
        ]);
        assert!(broken.validate().is_err());
    }

    #[test]
    fn condition_node_deserializes_untagged_from_json() {
        let node: ConditionNode = serde_json::from_str(
            r#"{"lhs":{"name":"environment"},"op":"eq","rhs":"prod"}"#,
        )
        .expect("simple condition");
        assert!(matches!(node, ConditionNode::Simple(_)));

        let node: ConditionNode = serde_json::from_str(
            r#"{"op":"and","conditions":[
                {"lhs":{"name":"a"},"op":"eq","rhs":1},
                {"lhs":{"name":"b"},"op":"in","rhs":[1,2]}
            ]}"#,
        )
        .expect("boolean condition");
        assert!(matches!(node, ConditionNode::Boolean(_)));
    }
}
