//! Monthly trend line with year-range markers.

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregation::MonthlyAggregate;
use crate::config::DashboardConfig;
use crate::error::Result;
use crate::filter::{RegionSelection, YearRange};
use crate::metric::MetricDescriptor;

const LINE_COLOR: &str = "#022B3A";
const MARKER_COLOR: &str = "#FF8966";
const SUBTITLE: &str = "(orange lines reflect range of selected years)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub title: String,
    pub subtitle: String,
    pub points: Vec<ChartPoint>,
    pub markers: [Marker; 2],
    pub axes: Axes,
    pub line_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Year-month key, e.g. "2022-6".
    pub x: String,
    pub y: Option<f64>,
    /// First day of the month, when year and month are known.
    pub date: Option<NaiveDate>,
    pub var_formatted: String,
    pub dashboard_var_label: String,
}

/// Vertical dashed line at a year-month key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub x: String,
    pub line_width: u32,
    pub line_dash: String,
    pub line_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axes {
    pub y_tick_format: String,
    pub x_tick_format: String,
    /// Plotly dtick; one tick every six months.
    pub x_dtick: String,
}

impl Marker {
    fn at(x: &str) -> Self {
        Self {
            x: x.to_string(),
            line_width: 2,
            line_dash: "dash".to_string(),
            line_color: MARKER_COLOR.to_string(),
        }
    }
}

pub fn build(
    mut months: Vec<MonthlyAggregate>,
    metric: &MetricDescriptor,
    years: YearRange,
    region: &RegionSelection,
    config: &DashboardConfig,
) -> Result<ChartView> {
    // unknown year/month sort after everything else
    months.sort_by(|a, b| {
        let key = |m: &MonthlyAggregate| (m.year.is_none(), m.year, m.month.is_none(), m.month);
        key(a).cmp(&key(b)).then_with(|| a.year_month.cmp(&b.year_month))
    });

    let points = months
        .into_iter()
        .map(|m| ChartPoint {
            date: first_of_month(m.year, m.month),
            var_formatted: metric.format(m.value),
            dashboard_var_label: metric.label.clone(),
            x: m.year_month,
            y: m.value,
        })
        .collect();

    let start = config.markers_for(years.start)?;
    let end = config.markers_for(years.end)?;

    Ok(ChartView {
        title: title(metric, region),
        subtitle: SUBTITLE.to_string(),
        points,
        markers: [Marker::at(&start.start), Marker::at(&end.end)],
        axes: Axes {
            y_tick_format: metric.axis_format.clone(),
            x_tick_format: "%b %Y".to_string(),
            x_dtick: "M6".to_string(),
        },
        line_color: LINE_COLOR.to_string(),
    })
}

fn first_of_month(year: Option<i64>, month: Option<i64>) -> Option<NaiveDate> {
    let year = i32::try_from(year?).ok()?;
    let month = u32::try_from(month?).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn title(metric: &MetricDescriptor, region: &RegionSelection) -> String {
    let label = metric.label.to_lowercase();
    match region.names().unwrap_or_default() {
        [] => format!("Countywide {label}"),
        [one] => format!("{one} {label}"),
        [first, second] => format!("{first} & {second} {label}"),
        _ => format!("{} For Selected Regions", metric.label),
    }
}
