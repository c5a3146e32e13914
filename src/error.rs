use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unknown metric: '{0}'")]
    UnknownMetric(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal invariant broken by the build or the config file. Not recoverable.
    #[error("Configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, DashError>;

impl DashError {
    /// Caused by what the caller passed in, not by data or configuration.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            DashError::InvalidFilter(_)
                | DashError::UnknownMetric(_)
                | DashError::InvalidArgument(_)
        )
    }
}

#[cfg(feature = "python")]
mod python {
    use super::DashError;
    use pyo3::exceptions::{PyRuntimeError, PyValueError};
    use pyo3::PyErr;

    impl From<DashError> for PyErr {
        fn from(err: DashError) -> PyErr {
            if err.is_invalid_input() {
                PyValueError::new_err(err.to_string())
            } else {
                PyRuntimeError::new_err(err.to_string())
            }
        }
    }
}
