//! End-to-end render of one dashboard interaction.
//!
//! filter -> {unit aggregate -> map, monthly aggregate -> chart, KPIs}.
//! Every call recomputes from the immutable dataset; nothing is cached here.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::aggregation;
use crate::chart_view::{self, ChartView};
use crate::config::DashboardConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{self, FilterScope, FilterState};
use crate::kpi::{self, KpiPanel};
use crate::map_view::{self, MapView};
use crate::metric::MetricRegistry;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub metric: String,
    pub map: MapView,
    pub chart: ChartView,
    pub kpis: KpiPanel,
}

impl DashboardView {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Borrowed view of everything a render needs.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    dataset: &'a Dataset,
    config: &'a DashboardConfig,
    metrics: &'a MetricRegistry,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        dataset: &'a Dataset,
        config: &'a DashboardConfig,
        metrics: &'a MetricRegistry,
    ) -> Self {
        Self {
            dataset,
            config,
            metrics,
        }
    }

    #[instrument(
        skip_all,
        fields(metric = %filter.metric, start = filter.years.start, end = filter.years.end)
    )]
    pub fn render(&self, filter: &FilterState) -> Result<DashboardView> {
        filter.validate(self.config)?;
        let metric = self.metrics.resolve(&filter.metric)?;
        let transactions = &self.dataset.transactions;

        let selected = filter::apply(transactions, filter, FilterScope::Selection)?;
        let history = filter::apply(transactions, filter, FilterScope::History)?;

        let units = aggregation::aggregate_by_unit(&selected, metric)?;
        let months = aggregation::aggregate_by_month(&history, metric)?;

        let map = map_view::build(
            &units,
            &self.dataset.boundaries,
            metric,
            filter.projection,
            filter.base_map,
            self.config,
        )?;
        let chart = chart_view::build(months, metric, filter.years, &filter.region, self.config)?;
        let kpis = kpi::compute(&selected, filter.years, metric)?;

        debug!(
            rows = selected.height(),
            map_units = map.rows.len(),
            chart_points = chart.points.len(),
            "rendered dashboard"
        );

        Ok(DashboardView {
            title: page_title(&self.config.county, filter),
            metric: metric.name.clone(),
            map,
            chart,
            kpis,
        })
    }

    /// Selection-filtered rows, for hosts that export the current view.
    pub fn filtered(&self, filter: &FilterState) -> Result<polars::prelude::DataFrame> {
        filter.validate(self.config)?;
        filter::apply(&self.dataset.transactions, filter, FilterScope::Selection)
    }
}

pub fn page_title(county: &str, filter: &FilterState) -> String {
    let years = filter.years;
    if years.is_single_year() {
        format!("{county} County Housing Trends | {} only", years.start)
    } else {
        format!(
            "{county} County Housing Trends | {} - {}",
            years.start, years.end
        )
    }
}
