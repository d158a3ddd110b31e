#![forbid(unsafe_code)]

//! seriesql builds analytics queries over metric time-series as immutable
//! expression trees. Nodes are assembled freely, transformed through pure
//! copy-with setters, and certified with [`Expression::validate`] before a
//! tree is handed to whatever compiles or executes it.
//!
//! ```
//! use seriesql::{Column, Condition, Expression, Formula, Metric, Op, Timeseries};
//!
//! let failures = Timeseries::new(
//!     Metric::from_mri("c:transactions.failures"),
//!     Some("sum".to_owned()),
//! );
//! let total = Timeseries::new(
//!     Metric::from_mri("c:transactions.count"),
//!     Some("sum".to_owned()),
//! );
//!
//! let failure_rate = Formula::new("divide", Some(vec![failures.into(), total.into()]))
//!     .set_filters(Some(vec![
//!         Condition::new(Column::new("environment"), Op::Eq, "production").into(),
//!     ]))
//!     .set_groupby(Some(vec![Column::new("release").into()]));
//!
//! failure_rate.validate()?;
//! # Ok::<(), seriesql::InvalidFormulaError>(())
//! ```

pub use sq_conditions::{
    BooleanCondition, BooleanOp, Condition, ConditionGroup, ConditionNode, ConditionValue,
    InvalidConditionError, Op,
};
pub use sq_expr::{
    AliasedExpression, Column, Expression, GroupKey, InvalidExpressionError,
};
pub use sq_formula::{
    ArithmeticOperator, Formula, FormulaParameter, InvalidArithmeticError, InvalidFormulaError,
};
pub use sq_timeseries::{
    AggregateParam, InvalidMetricError, InvalidTimeseriesError, Metric, Timeseries,
};
