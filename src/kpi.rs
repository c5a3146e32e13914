//! Headline statistics and year-over-year deltas for the KPI panel.

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::filter::{self, YearRange};
use crate::format::{self, NumberFormat};
use crate::metric::{self, MetricDescriptor, PRICE_OVERALL, PRICE_PER_SF, TOTAL_SALES};
use crate::schema::transactions;

pub const SINGLE_YEAR_NOTE: &str = "No year over year change for single year selection.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiPanel {
    /// Total sales, median price (per SF), median price (overall),
    /// median vintage, median size, in that order.
    pub headlines: Vec<Kpi>,
    /// Index into `headlines` of the active metric's figure, if it has one.
    pub primary: Option<usize>,
    pub year_over_year: YearOverYear,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    /// Metric registry name this figure belongs to, if any.
    pub metric: Option<String>,
    pub label: String,
    pub value: Option<f64>,
    pub formatted: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum YearOverYear {
    /// Start and end year coincide; nothing to compare.
    SingleYear { note: String },
    Compared {
        label: String,
        deltas: Vec<KpiDelta>,
        /// Index into `deltas` of the active metric's change, if it has one.
        primary: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiDelta {
    pub metric: String,
    /// Fractional change; `None` when the start year gives no denominator.
    pub value: Option<f64>,
    pub formatted: String,
}

impl KpiPanel {
    pub fn headline(&self, label: &str) -> Option<&Kpi> {
        self.headlines.iter().find(|k| k.label == label)
    }
}

fn kpi(metric: Option<&str>, label: &str, value: Option<f64>, fmt: &NumberFormat) -> Kpi {
    Kpi {
        metric: metric.map(str::to_string),
        label: label.to_string(),
        value,
        formatted: fmt.format(value),
    }
}

fn column_median(df: &DataFrame, name: &str) -> Result<Option<f64>> {
    metric::median(df.column(name)?.as_materialized_series())
}

fn non_null_count(df: &DataFrame, name: &str) -> Result<f64> {
    let column = df.column(name)?;
    Ok((column.len() - column.null_count()) as f64)
}

/// `(end - start) / start`, undefined for a missing or zero start.
pub fn relative_change(start: Option<f64>, end: Option<f64>) -> Option<f64> {
    let (start, end) = (start?, end?);
    if start == 0.0 || !start.is_finite() || !end.is_finite() {
        return None;
    }
    Some((end - start) / start)
}

/// KPIs over the selection-filtered table.
pub fn compute(
    filtered: &DataFrame,
    years: YearRange,
    active: &MetricDescriptor,
) -> Result<KpiPanel> {
    let headlines = vec![
        kpi(
            Some(TOTAL_SALES),
            "Total sales",
            Some(filtered.height() as f64),
            &NumberFormat::count(),
        ),
        kpi(
            Some(PRICE_PER_SF),
            "Median price (per SF)",
            column_median(filtered, transactions::PRICE_SF)?,
            &NumberFormat::new("$", 0, false),
        ),
        kpi(
            Some(PRICE_OVERALL),
            "Median price (overall)",
            column_median(filtered, transactions::TRANSFER_AMOUNT)?,
            &NumberFormat::dollars(),
        ),
        kpi(
            None,
            "Median vintage",
            column_median(filtered, transactions::YEAR_BUILT)?,
            &NumberFormat::new("", 0, false),
        ),
        kpi(
            None,
            "Median size (SF)",
            column_median(filtered, transactions::AREA_GROSS)?,
            &NumberFormat::count(),
        ),
    ];
    let primary = headlines
        .iter()
        .position(|k| k.metric.as_deref() == Some(active.name.as_str()));

    let year_over_year = if years.is_single_year() {
        YearOverYear::SingleYear {
            note: SINGLE_YEAR_NOTE.to_string(),
        }
    } else {
        let first = filter::rows_in_year(filtered, years.start)?;
        let last = filter::rows_in_year(filtered, years.end)?;
        debug!(
            start_rows = first.height(),
            end_rows = last.height(),
            "year-over-year split"
        );

        let pairs = [
            (
                TOTAL_SALES,
                Some(non_null_count(&first, transactions::PRICE_SF)?),
                Some(non_null_count(&last, transactions::PRICE_SF)?),
            ),
            (
                PRICE_PER_SF,
                column_median(&first, transactions::PRICE_SF)?,
                column_median(&last, transactions::PRICE_SF)?,
            ),
            (
                PRICE_OVERALL,
                column_median(&first, transactions::TRANSFER_AMOUNT)?,
                column_median(&last, transactions::TRANSFER_AMOUNT)?,
            ),
        ];
        let deltas: Vec<KpiDelta> = pairs
            .into_iter()
            .map(|(name, start, end)| {
                let value = relative_change(start, end);
                KpiDelta {
                    metric: name.to_string(),
                    value,
                    formatted: format::percent(value),
                }
            })
            .collect();
        let primary = deltas.iter().position(|d| d.metric == active.name);

        YearOverYear::Compared {
            label: format!("{} to {} change", years.start, years.end),
            deltas,
            primary,
        }
    };

    Ok(KpiPanel {
        headlines,
        primary,
        year_over_year,
    })
}
