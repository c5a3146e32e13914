//! Registry of selectable dashboard metrics.
//!
//! A metric names a source column, how a group of rows collapses into one
//! value, and how that value is displayed. The pipeline resolves the user's
//! choice once per render and passes the descriptor down explicitly.

use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::format::NumberFormat;
use crate::schema::transactions;

pub const TOTAL_SALES: &str = "Total sales";
pub const PRICE_PER_SF: &str = "Price (per SF)";
pub const PRICE_OVERALL: &str = "Price (overall)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationKind {
    /// Number of non-null values in the source column.
    Count,
    /// Median of the non-null values; `None` when there are none.
    Median,
}

impl AggregationKind {
    pub fn apply(self, values: &Series) -> Result<Option<f64>> {
        match self {
            AggregationKind::Count => Ok(Some((values.len() - values.null_count()) as f64)),
            AggregationKind::Median => median(values),
        }
    }
}

impl FromStr for AggregationKind {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "count" => Ok(AggregationKind::Count),
            "median" => Ok(AggregationKind::Median),
            other => Err(DashError::InvalidArgument(format!(
                "unknown aggregation '{other}', expected 'count' or 'median'"
            ))),
        }
    }
}

/// Null-skipping median of a numeric column.
pub fn median(values: &Series) -> Result<Option<f64>> {
    let as_float = values.cast(&DataType::Float64)?;
    Ok(as_float.f64()?.median())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDescriptor {
    /// Name shown on the selector, e.g. "Price (per SF)".
    pub name: String,
    /// Transaction column the aggregation reads.
    pub column: String,
    pub aggregation: AggregationKind,
    /// Template for map tooltips, chart hover text and the primary KPI.
    pub value_format: NumberFormat,
    /// Display label, e.g. "Median price (per SF)".
    pub label: String,
    /// d3-style tick format handed to the chart backend.
    pub axis_format: String,
    /// Whether the 3D extruded map is offered for this metric.
    #[serde(default)]
    pub extrudable: bool,
}

impl MetricDescriptor {
    /// Apply this metric's aggregation to a group of rows.
    pub fn aggregate(&self, rows: &DataFrame) -> Result<Option<f64>> {
        let values = rows
            .column(&self.column)
            .map_err(|_| DashError::ColumnNotFound(self.column.clone()))?
            .as_materialized_series();
        self.aggregation.apply(values)
    }

    pub fn format(&self, value: Option<f64>) -> String {
        self.value_format.format(value)
    }

    fn check(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("column", &self.column),
            ("label", &self.label),
        ] {
            if value.trim().is_empty() {
                return Err(DashError::Configuration(format!(
                    "metric descriptor has an empty {field}"
                )));
            }
        }
        // only the normalized columns survive loading
        if !transactions::ALL.contains(&self.column.as_str()) {
            return Err(DashError::Configuration(format!(
                "metric '{}' reads '{}', which is not a transaction column",
                self.name, self.column
            )));
        }
        Ok(())
    }
}

/// Ordered, name-keyed set of metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRegistry {
    metrics: Vec<MetricDescriptor>,
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self {
            metrics: vec![
                MetricDescriptor {
                    name: TOTAL_SALES.into(),
                    column: transactions::YEAR_BUILT.into(),
                    aggregation: AggregationKind::Count,
                    value_format: NumberFormat::count(),
                    label: "Total sales".into(),
                    axis_format: ",.0f".into(),
                    extrudable: false,
                },
                MetricDescriptor {
                    name: PRICE_PER_SF.into(),
                    column: transactions::PRICE_SF.into(),
                    aggregation: AggregationKind::Median,
                    value_format: NumberFormat::new("$", 2, false),
                    label: "Median price (per SF)".into(),
                    axis_format: "$.0f".into(),
                    extrudable: true,
                },
                MetricDescriptor {
                    name: PRICE_OVERALL.into(),
                    column: transactions::TRANSFER_AMOUNT.into(),
                    aggregation: AggregationKind::Median,
                    value_format: NumberFormat::dollars(),
                    label: "Median price (overall)".into(),
                    axis_format: "$,.0f".into(),
                    extrudable: true,
                },
            ],
        }
    }
}

impl MetricRegistry {
    pub fn empty() -> Self {
        Self { metrics: Vec::new() }
    }

    pub fn register(&mut self, descriptor: MetricDescriptor) -> Result<()> {
        descriptor.check()?;
        if self.get(&descriptor.name).is_some() {
            return Err(DashError::Configuration(format!(
                "metric '{}' registered twice",
                descriptor.name
            )));
        }
        self.metrics.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&MetricDescriptor> {
        self.metrics.iter().find(|m| m.name == name)
    }

    pub fn resolve(&self, name: &str) -> Result<&MetricDescriptor> {
        self.get(name)
            .ok_or_else(|| DashError::UnknownMetric(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|m| m.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}
