use std::sync::Arc;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::DashboardConfig;
use crate::dataset::Dataset;
use crate::error::{DashError, Result};
use crate::filter::{FilterState, RegionSelection, VintageBand, VintageRange, YearRange};
use crate::format::NumberFormat;
use crate::metric::{AggregationKind, MetricDescriptor, MetricRegistry};
use crate::pipeline::Pipeline;

const ENTIRE_COUNTY: &str = "Entire county";
const CITY_REGION: &str = "City/Region";

/// Dashboard core handed to the Python shell.
///
/// Construction loads both tables once; every `render` call reuses them.
#[pyclass(name = "Dashboard")]
pub struct PyDashboard {
    dataset: Arc<Dataset>,
    config: DashboardConfig,
    metrics: MetricRegistry,
}

#[pymethods]
impl PyDashboard {
    #[new]
    #[pyo3(signature = (transactions_path, boundaries_path, config_path=None))]
    fn new(
        transactions_path: &str,
        boundaries_path: &str,
        config_path: Option<&str>,
    ) -> PyResult<Self> {
        let config = match config_path {
            Some(path) => DashboardConfig::from_json_file(path)?,
            None => DashboardConfig::default(),
        };
        config.validate()?;
        let dataset = Dataset::load(transactions_path, boundaries_path)?;
        Ok(Self {
            dataset: Arc::new(dataset),
            config,
            metrics: MetricRegistry::default(),
        })
    }

    // ── Rendering ───────────────────────────────────────────────────────────

    /// Run the full pipeline and return the dashboard view as JSON.
    ///
    /// Args:
    ///     years: (start, end) transaction years
    ///     year_built: (start band, end band), e.g. ("<2000", "2011-2023")
    ///                 (default: all bands)
    ///     geography: "Entire county" or "City/Region"
    ///     sub_regions: region names, used with "City/Region"
    ///     metric: "Total sales", "Price (per SF)" or "Price (overall)"
    ///     map_view: "2D" or "3D"
    ///     base_map: "Dark", "Light", "Satellite" or "Streets"
    #[pyo3(signature = (
        years,
        year_built = None,
        geography = ENTIRE_COUNTY,
        sub_regions = None,
        metric = "Price (per SF)",
        map_view = "2D",
        base_map = "Streets",
    ))]
    fn render(
        &self,
        years: (i32, i32),
        year_built: Option<(String, String)>,
        geography: &str,
        sub_regions: Option<Vec<String>>,
        metric: &str,
        map_view: &str,
        base_map: &str,
    ) -> PyResult<String> {
        let filter = filter_state(
            years,
            year_built,
            geography,
            sub_regions,
            metric,
            map_view,
            base_map,
        )?;
        let view = self.pipeline().render(&filter)?;
        Ok(view.to_json()?)
    }

    /// The selection-filtered transaction table for the same arguments.
    #[pyo3(signature = (
        years,
        year_built = None,
        geography = ENTIRE_COUNTY,
        sub_regions = None,
    ))]
    fn filtered(
        &self,
        years: (i32, i32),
        year_built: Option<(String, String)>,
        geography: &str,
        sub_regions: Option<Vec<String>>,
    ) -> PyResult<PyDataFrame> {
        let filter = filter_state(
            years,
            year_built,
            geography,
            sub_regions,
            crate::metric::TOTAL_SALES,
            "2D",
            "Streets",
        )?;
        Ok(PyDataFrame(self.pipeline().filtered(&filter)?))
    }

    // ── Metrics ─────────────────────────────────────────────────────────────

    fn metrics(&self) -> Vec<String> {
        self.metrics.names().map(str::to_string).collect()
    }

    /// Add a metric to the selector.
    #[pyo3(signature = (
        name,
        column,
        aggregation,
        label,
        prefix = "",
        decimals = 0,
        thousands = true,
        axis_format = ",.0f",
        extrudable = false,
    ))]
    fn register_metric(
        &mut self,
        name: &str,
        column: &str,
        aggregation: &str,
        label: &str,
        prefix: &str,
        decimals: usize,
        thousands: bool,
        axis_format: &str,
        extrudable: bool,
    ) -> PyResult<()> {
        let aggregation: AggregationKind = aggregation.parse()?;
        self.metrics.register(MetricDescriptor {
            name: name.to_string(),
            column: column.to_string(),
            aggregation,
            value_format: NumberFormat::new(prefix, decimals, thousands),
            label: label.to_string(),
            axis_format: axis_format.to_string(),
            extrudable,
        })?;
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn transactions_df(&self) -> PyDataFrame {
        PyDataFrame(self.dataset.transactions.frame().clone())
    }

    #[getter]
    fn boundaries_df(&self) -> PyDataFrame {
        PyDataFrame(self.dataset.boundaries.frame().clone())
    }

    #[getter]
    fn sub_regions(&self) -> Vec<String> {
        self.config.sub_regions.clone()
    }

    #[getter]
    fn year_options(&self) -> Vec<i32> {
        self.config.year_options.clone()
    }

    #[getter]
    fn county(&self) -> String {
        self.config.county.clone()
    }
}

impl PyDashboard {
    fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.dataset, &self.config, &self.metrics)
    }
}

fn filter_state(
    years: (i32, i32),
    year_built: Option<(String, String)>,
    geography: &str,
    sub_regions: Option<Vec<String>>,
    metric: &str,
    map_view: &str,
    base_map: &str,
) -> Result<FilterState> {
    let vintage = match year_built {
        Some((start, end)) => VintageRange::new(start.parse::<VintageBand>()?, end.parse()?),
        None => VintageRange::all(),
    };
    let region = match geography {
        ENTIRE_COUNTY => RegionSelection::EntireCounty,
        CITY_REGION => RegionSelection::Subset(sub_regions.unwrap_or_default()),
        other => {
            return Err(DashError::InvalidFilter(format!("unknown geography '{other}'")));
        }
    };

    Ok(FilterState::new(YearRange::new(years.0, years.1), metric)
        .with_vintage(vintage)
        .with_region(region)
        .with_projection(map_view.parse()?)
        .with_base_map(base_map.parse()?))
}

/// Install the tracing subscriber. Safe to call more than once.
#[pyfunction]
#[pyo3(signature = (filter = "info"))]
pub fn init_logging(filter: &str) -> bool {
    crate::logging::init(filter)
}
