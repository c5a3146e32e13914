use polars::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::metric::MetricDescriptor;
use crate::schema::{aggregates, transactions};

/// Per-unit map aggregate.
///
/// Columns: `GEOID` (String), `metric_value` (Float64, null when undefined),
/// `sales` (UInt32 row count), `Sub_geo` (String, modal label).
/// One row per unit, in first-seen order. Rows with no `GEOID` are left
/// out and counted in [`UnitAggregate::unkeyed_rows`].
#[derive(Debug, Clone)]
pub struct UnitAggregate {
    frame: DataFrame,
    unkeyed_rows: usize,
}

impl UnitAggregate {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    pub fn total_sales(&self) -> Result<u64> {
        let sales = self.frame.column(aggregates::SALES)?.u32()?;
        Ok(sales.into_iter().flatten().map(u64::from).sum())
    }

    /// Filtered rows that had no unit id and so belong to no unit.
    pub fn unkeyed_rows(&self) -> usize {
        self.unkeyed_rows
    }
}

/// One calendar month of the chart series. Not sorted.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyAggregate {
    pub year_month: String,
    pub year: Option<i64>,
    pub month: Option<i64>,
    pub value: Option<f64>,
}

/// Group filtered rows by `GEOID` and apply `metric` to each group.
pub fn aggregate_by_unit(
    filtered: &DataFrame,
    metric: &MetricDescriptor,
) -> Result<UnitAggregate> {
    let mut geoids: Vec<String> = Vec::new();
    let mut values: Vec<Option<f64>> = Vec::new();
    let mut sales: Vec<u32> = Vec::new();
    let mut labels: Vec<Option<String>> = Vec::new();
    let mut unkeyed_rows = 0;

    for group in partitions(filtered, transactions::GEOID)? {
        let geoid = group
            .column(transactions::GEOID)?
            .str()?
            .get(0)
            .map(str::to_string);
        let Some(geoid) = geoid else {
            unkeyed_rows += group.height();
            continue;
        };
        let label = modal(group.column(transactions::SUB_GEO)?.str()?.into_iter());
        values.push(metric.aggregate(&group)?);
        sales.push(group.height() as u32);
        labels.push(label.map(str::to_string));
        geoids.push(geoid);
    }

    let frame = df!(
        transactions::GEOID => geoids,
        aggregates::METRIC_VALUE => values,
        aggregates::SALES => sales,
        transactions::SUB_GEO => labels,
    )?;
    if unkeyed_rows > 0 {
        debug!(unkeyed_rows, "rows without GEOID left out of unit aggregate");
    }
    debug!(metric = %metric.name, units = frame.height(), "aggregated by unit");
    Ok(UnitAggregate {
        frame,
        unkeyed_rows,
    })
}

/// Group rows by `year-month` and apply `metric` to each month.
pub fn aggregate_by_month(
    history: &DataFrame,
    metric: &MetricDescriptor,
) -> Result<Vec<MonthlyAggregate>> {
    let mut months = Vec::new();
    for group in partitions(history, transactions::YEAR_MONTH)? {
        let Some(year_month) = group
            .column(transactions::YEAR_MONTH)?
            .str()?
            .get(0)
            .map(str::to_string)
        else {
            continue;
        };
        months.push(MonthlyAggregate {
            year_month,
            year: modal(group.column(transactions::YEAR)?.i64()?.into_iter()),
            month: modal(group.column(transactions::MONTH)?.i64()?.into_iter()),
            value: metric.aggregate(&group)?,
        });
    }
    debug!(metric = %metric.name, months = months.len(), "aggregated by month");
    Ok(months)
}

/// Split `df` into per-key groups, in order of each key's first row.
fn partitions(df: &DataFrame, key: &str) -> Result<Vec<DataFrame>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    Ok(df.partition_by_stable([key], true)?)
}

/// Most frequent non-null value. Ties go to the value seen first.
pub fn modal<T, I>(values: I) -> Option<T>
where
    T: PartialEq + Copy,
    I: IntoIterator<Item = Option<T>>,
{
    let mut counts: Vec<(T, usize)> = Vec::new();
    for value in values.into_iter().flatten() {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, n)) => *n += 1,
            None => counts.push((value, 1)),
        }
    }

    let mut best: Option<(T, usize)> = None;
    for (value, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((value, n));
        }
    }
    best.map(|(value, _)| value)
}
