pub mod aggregation;
pub mod chart_view;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod format;
pub mod kpi;
pub mod logging;
pub mod map_view;
pub mod metric;
pub mod pipeline;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use config::DashboardConfig;
pub use dataset::{BoundaryTable, Dataset, TransactionTable};
pub use error::{DashError, Result};
pub use filter::{
    BaseMap, FilterScope, FilterState, MapProjection, RegionSelection, VintageBand, VintageRange,
    YearRange,
};
pub use metric::{AggregationKind, MetricDescriptor, MetricRegistry};
pub use pipeline::{DashboardView, Pipeline};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Transactions
    let transactions = PyModule::new(m.py(), "transactions")?;
    transactions.add("YEAR", schema::transactions::YEAR)?;
    transactions.add("YEAR_MONTH", schema::transactions::YEAR_MONTH)?;
    transactions.add("MONTH", schema::transactions::MONTH)?;
    transactions.add("YEAR_BUILT", schema::transactions::YEAR_BUILT)?;
    transactions.add("TRANSFER_AMOUNT", schema::transactions::TRANSFER_AMOUNT)?;
    transactions.add("PRICE_SF", schema::transactions::PRICE_SF)?;
    transactions.add("AREA_GROSS", schema::transactions::AREA_GROSS)?;
    transactions.add("GEOID", schema::transactions::GEOID)?;
    transactions.add("SUB_GEO", schema::transactions::SUB_GEO)?;
    m.add_submodule(&transactions)?;

    // Boundaries
    let boundaries = PyModule::new(m.py(), "boundaries")?;
    boundaries.add("GEOID", schema::boundaries::GEOID)?;
    boundaries.add("BOUNDARY_IDX", schema::boundaries::BOUNDARY_IDX)?;
    m.add_submodule(&boundaries)?;

    // Aggregates
    let aggregates = PyModule::new(m.py(), "aggregates")?;
    aggregates.add("METRIC_VALUE", schema::aggregates::METRIC_VALUE)?;
    aggregates.add("SALES", schema::aggregates::SALES)?;
    m.add_submodule(&aggregates)?;

    // Map feature properties
    let features = PyModule::new(m.py(), "features")?;
    features.add("GEOID", schema::features::GEOID)?;
    features.add("SUB_GEO", schema::features::SUB_GEO)?;
    features.add("METRIC_VALUE", schema::features::METRIC_VALUE)?;
    features.add("SALES", schema::features::SALES)?;
    features.add("VAR_FORMATTED", schema::features::VAR_FORMATTED)?;
    features.add("VAR_LABEL", schema::features::VAR_LABEL)?;
    features.add("CHORO_COLOR", schema::features::CHORO_COLOR)?;
    features.add("ELEVATION", schema::features::ELEVATION)?;
    m.add_submodule(&features)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn housing_trends(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyDashboard>()?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
