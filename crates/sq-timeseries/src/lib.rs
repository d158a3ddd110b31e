#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use sq_conditions::{ConditionGroup, ConditionNode, InvalidConditionError};
use sq_expr::{Expression, GroupKey, InvalidExpressionError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidMetricError {
    #[error("metric must have at least one of a public name or an MRI")]
    MissingName,
    #[error("metric public name cannot be empty")]
    EmptyPublicName,
    #[error("metric MRI cannot be empty")]
    EmptyMri,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum InvalidTimeseriesError {
    #[error(transparent)]
    Metric(#[from] InvalidMetricError),
    #[error("timeseries aggregate cannot be empty")]
    EmptyAggregate,
    #[error("aggregate parameters require an aggregate")]
    ParamsWithoutAggregate,
    #[error(transparent)]
    Filter(#[from] InvalidConditionError),
    #[error(transparent)]
    GroupKey(#[from] InvalidExpressionError),
}

/// A reference to one metric, by public name, by MRI, or both. The numeric
/// id is an optional backend-resolved shortcut and carries no validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    #[serde(default)]
    public_name: Option<String>,
    #[serde(default)]
    mri: Option<String>,
    #[serde(default)]
    id: Option<u64>,
}

impl Metric {
    #[must_use]
    pub fn new(public_name: Option<String>, mri: Option<String>, id: Option<u64>) -> Self {
        Self {
            public_name,
            mri,
            id,
        }
    }

    #[must_use]
    pub fn from_public_name(public_name: impl Into<String>) -> Self {
        Self::new(Some(public_name.into()), None, None)
    }

    #[must_use]
    pub fn from_mri(mri: impl Into<String>) -> Self {
        Self::new(None, Some(mri.into()), None)
    }

    #[must_use]
    pub fn public_name(&self) -> Option<&str> {
        self.public_name.as_deref()
    }

    #[must_use]
    pub fn mri(&self) -> Option<&str> {
        self.mri.as_deref()
    }

    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.id
    }

    #[must_use]
    pub fn set_public_name(&self, public_name: impl Into<String>) -> Self {
        Self {
            public_name: Some(public_name.into()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_mri(&self, mri: impl Into<String>) -> Self {
        Self {
            mri: Some(mri.into()),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_id(&self, id: u64) -> Self {
        Self {
            id: Some(id),
            ..self.clone()
        }
    }
}

impl Expression for Metric {
    type Error = InvalidMetricError;

    fn validate(&self) -> Result<(), InvalidMetricError> {
        if self.public_name.is_none() && self.mri.is_none() {
            return Err(InvalidMetricError::MissingName);
        }
        if matches!(self.public_name.as_deref(), Some("")) {
            return Err(InvalidMetricError::EmptyPublicName);
        }
        if matches!(self.mri.as_deref(), Some("")) {
            return Err(InvalidMetricError::EmptyMri);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AggregateParam {
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<i64> for AggregateParam {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AggregateParam {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for AggregateParam {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

/// A single metric time-series: which metric, how it is aggregated, and
/// optionally which rows feed it (`filters`) and how the result is grouped
/// (`groupby`). Immutable; every setter returns a new value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeseries {
    metric: Metric,
    #[serde(default)]
    aggregate: Option<String>,
    #[serde(default)]
    aggregate_params: Option<Vec<AggregateParam>>,
    #[serde(default)]
    filters: Option<ConditionGroup>,
    #[serde(default)]
    groupby: Option<Vec<GroupKey>>,
}

impl Timeseries {
    #[must_use]
    pub fn new(metric: Metric, aggregate: Option<String>) -> Self {
        Self {
            metric,
            aggregate,
            aggregate_params: None,
            filters: None,
            groupby: None,
        }
    }

    #[must_use]
    pub fn metric(&self) -> &Metric {
        &self.metric
    }

    #[must_use]
    pub fn aggregate(&self) -> Option<&str> {
        self.aggregate.as_deref()
    }

    #[must_use]
    pub fn aggregate_params(&self) -> Option<&[AggregateParam]> {
        self.aggregate_params.as_deref()
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
    pub fn set_metric(&self, metric: Metric) -> Self {
        Self {
            metric,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn set_aggregate(
        &self,
        aggregate: impl Into<String>,
        aggregate_params: Option<Vec<AggregateParam>>,
    ) -> Self {
        Self {
            aggregate: Some(aggregate.into()),
            aggregate_params,
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

impl Expression for Timeseries {
    type Error = InvalidTimeseriesError;

    fn validate(&self) -> Result<(), InvalidTimeseriesError> {
        #[cfg(feature = "tracing")]
        tracing::trace!(metric = ?self.metric, aggregate = ?self.aggregate, "validating timeseries");

        self.metric.validate()?;
        if matches!(self.aggregate.as_deref(), Some("")) {
            return Err(InvalidTimeseriesError::EmptyAggregate);
        }
        if self.aggregate_params.is_some() && self.aggregate.is_none() {
            return Err(InvalidTimeseriesError::ParamsWithoutAggregate);
        }
        if let Some(filters) = &self.filters {
            for filter in filters {
                filter.validate()?;
            }
        }
        if let Some(groupby) = &self.groupby {
            for key in groupby {
                key.validate()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sq_conditions::{Condition, Op};
    use sq_expr::{Column, Expression};

    use super::{InvalidMetricError, InvalidTimeseriesError, Metric, Timeseries};

    fn duration_series() -> Timeseries {
        Timeseries::new(
            Metric::from_mri("d:transactions.duration"),
            Some("avg".to_owned()),
        )
    }

    #[test]
    fn metric_requires_some_name() {
        let err = Metric::default().validate().expect_err("must fail");
        assert_eq!(err, InvalidMetricError::MissingName);

        Metric::from_public_name("transaction.duration")
            .validate()
            .expect("public name alone is enough");
        Metric::from_mri("d:transactions.duration")
            .validate()
            .expect("mri alone is enough");
    }

    #[test]
    fn metric_rejects_empty_names() {
        let err = Metric::from_public_name("").validate().expect_err("must fail");
        assert_eq!(err, InvalidMetricError::EmptyPublicName);
    }

    #[test]
    fn metric_setters_do_not_mutate_receiver() {
        let base = Metric::from_mri("d:transactions.duration");
        let with_id = base.set_id(42);
        assert_eq!(base.id(), None);
        assert_eq!(with_id.id(), Some(42));
        assert_eq!(with_id.mri(), base.mri());
    }

    #[test]
    fn timeseries_validates_its_own_metric() {
        let bare = Timeseries::new(Metric::default(), None);
        let err = bare.validate().expect_err("must fail");
        assert_eq!(
            err,
            InvalidTimeseriesError::Metric(InvalidMetricError::MissingName)
        );
    }

    #[test]
    fn empty_aggregate_is_rejected() {
        let series = Timeseries::new(
            Metric::from_mri("d:transactions.duration"),
            Some(String::new()),
        );
        assert_eq!(
            series.validate().expect_err("must fail"),
            InvalidTimeseriesError::EmptyAggregate
        );
    }

    #[test]
    fn aggregate_params_require_an_aggregate() {
        let series = Timeseries::new(Metric::from_mri("d:transactions.duration"), None)
            .set_aggregate("quantile", Some(vec![0.95.into()]));
        series.validate().expect("quantile(0.95) is fine");

        let orphaned = Timeseries {
            aggregate: None,
            ..series
        };
        assert_eq!(
            orphaned.validate().expect_err("must fail"),
            InvalidTimeseriesError::ParamsWithoutAggregate
        );
    }

    #[test]
    fn timeseries_validates_filters_and_groupby_elements() {
        let series = duration_series()
            .set_filters(Some(vec![
                Condition::new(Column::new("environment"), Op::Eq, "prod").into(),
            ]))
            .set_groupby(Some(vec![Column::new("release").into()]));
        series.validate().expect("well-formed series");

        let broken = series.set_filters(Some(vec![
            Condition::new(Column::new("release"), Op::In, "1.0.0").into(),
        ]));
        assert!(broken.validate().is_err());
    }

    #[test]
    fn setters_replace_one_field_and_share_the_rest() {
        let base = duration_series();
        let grouped = base.set_groupby(Some(vec![Column::new("environment").into()]));

        assert_eq!(base.groupby(), None);
        assert_eq!(grouped.groupby().map(<[_]>::len), Some(1));
        assert_eq!(grouped.metric(), base.metric());
        assert_eq!(grouped.aggregate(), base.aggregate());
    }

    #[test]
    fn timeseries_round_trips_through_json() {
        let series = duration_series().set_groupby(Some(vec![Column::new("release").into()]));
        let encoded = serde_json::to_string(&series).expect("serializes");
        let decoded: Timeseries = serde_json::from_str(&encoded).expect("deserializes");
        assert_eq!(decoded, series);
    }
}
