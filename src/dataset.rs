//! One-time loading of the transaction table and the boundary polygons.
//!
//! Both tables are normalized on load and never mutated afterwards; the host
//! keeps the resulting [`Dataset`] alive and lends it to every render.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use geojson::{feature::Id, Feature, GeoJson, Geometry};
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::{DashError, Result};
use crate::schema::{boundaries, transactions};

// ── Transactions ────────────────────────────────────────────────────────────

/// Immutable, typed transaction table.
///
/// Columns: `year`, `month`, `YearBuilt` as Int64; `TransferAmount`,
/// `price_sf`, `AreaGross` as Float64; `year-month`, `GEOID`, `Sub_geo` as
/// String. Nothing else survives loading.
#[derive(Debug, Clone)]
pub struct TransactionTable {
    frame: DataFrame,
}

impl TransactionTable {
    /// Read a transactions CSV. Numbers may carry thousands separators.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed)?;

        let table = Self::from_frame(df)?;
        info!(
            path = %path.display(),
            rows = table.height(),
            "loaded transactions"
        );
        Ok(table)
    }

    /// Normalize an in-memory frame (string or already-typed columns).
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        require_columns(&df, &transactions::ALL)?;

        let mut columns: Vec<Column> = Vec::with_capacity(transactions::ALL.len());
        for name in transactions::ALL {
            let series = df.column(name)?.as_materialized_series();
            let normalized = if transactions::INTEGER.contains(&name) {
                to_int64(series)?
            } else if transactions::FLOAT.contains(&name) {
                to_float64(series)?
            } else {
                to_text(series)?
            };
            columns.push(normalized.into());
        }

        Ok(Self {
            frame: DataFrame::new(columns)?,
        })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }
}

fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(DashError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

fn clean_number(raw: &str) -> String {
    raw.trim().replace(',', "")
}

fn parse_int(raw: &str) -> Option<i64> {
    let cleaned = clean_number(raw);
    cleaned.parse::<i64>().ok().or_else(|| {
        cleaned
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn parse_float(raw: &str) -> Option<f64> {
    clean_number(raw)
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

fn to_int64(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        let parsed: Int64Chunked = series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_int))
            .collect();
        Ok(parsed.with_name(series.name().clone()).into_series())
    } else {
        Ok(series.cast(&DataType::Int64)?)
    }
}

fn to_float64(series: &Series) -> Result<Series> {
    if series.dtype() == &DataType::String {
        let parsed: Float64Chunked = series
            .str()?
            .into_iter()
            .map(|v| v.and_then(parse_float))
            .collect();
        Ok(parsed.with_name(series.name().clone()).into_series())
    } else {
        Ok(series.cast(&DataType::Float64)?)
    }
}

fn to_text(series: &Series) -> Result<Series> {
    let series = if series.dtype() == &DataType::String {
        series.clone()
    } else {
        series.cast(&DataType::String)?
    };
    let trimmed: StringChunked = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::trim).filter(|s| !s.is_empty()))
        .collect();
    Ok(trimmed.with_name(series.name().clone()).into_series())
}

// ── Boundaries ──────────────────────────────────────────────────────────────

/// Boundary polygons keyed by unit id.
///
/// `frame` holds `GEOID` + `boundary_idx` for joining; the index points into
/// `geometries`.
#[derive(Debug, Clone)]
pub struct BoundaryTable {
    frame: DataFrame,
    geometries: Vec<Option<Geometry>>,
}

impl BoundaryTable {
    pub fn from_geojson_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let table = Self::from_geojson(GeoJson::from_reader(reader)?)?;
        info!(
            path = %path.display(),
            units = table.len(),
            "loaded boundaries"
        );
        Ok(table)
    }

    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Self::from_geojson(text.parse::<GeoJson>()?)
    }

    pub fn from_geojson(geojson: GeoJson) -> Result<Self> {
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(_) => {
                return Err(DashError::InvalidData(
                    "boundary file must contain features, not a bare geometry".into(),
                ))
            }
        };
        Self::from_features(features)
    }

    fn from_features(features: Vec<Feature>) -> Result<Self> {
        let mut ids: Vec<String> = Vec::with_capacity(features.len());
        let mut geometries = Vec::with_capacity(features.len());
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (i, feature) in features.into_iter().enumerate() {
            let id = unit_id(&feature).ok_or_else(|| {
                DashError::InvalidData(format!(
                    "boundary feature {i} has no {} property",
                    boundaries::GEOID
                ))
            })?;
            if let Some(first) = seen.get(&id) {
                warn!(geoid = %id, first, duplicate = i, "duplicate boundary id, keeping first");
                continue;
            }
            seen.insert(id.clone(), ids.len());
            ids.push(id);
            geometries.push(feature.geometry);
        }

        let idx: Vec<u32> = (0..ids.len() as u32).collect();
        let frame = df!(
            boundaries::GEOID => ids,
            boundaries::BOUNDARY_IDX => idx,
        )?;

        Ok(Self { frame, geometries })
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn geometry(&self, idx: usize) -> Option<&Geometry> {
        self.geometries.get(idx).and_then(Option::as_ref)
    }

    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}

fn unit_id(feature: &Feature) -> Option<String> {
    let from_property = feature
        .property(boundaries::GEOID)
        .and_then(|value| match value {
            serde_json::Value::String(s) => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });
    from_property
        .or_else(|| match &feature.id {
            Some(Id::String(s)) => Some(s.clone()),
            Some(Id::Number(n)) => Some(n.to_string()),
            None => None,
        })
        .filter(|s| !s.is_empty())
}

// ── Dataset ─────────────────────────────────────────────────────────────────

/// Everything the pipeline reads. Loaded once per process by the host.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub transactions: TransactionTable,
    pub boundaries: BoundaryTable,
}

impl Dataset {
    pub fn new(transactions: TransactionTable, boundaries: BoundaryTable) -> Self {
        Self {
            transactions,
            boundaries,
        }
    }

    pub fn load(
        transactions_path: impl AsRef<Path>,
        boundaries_path: impl AsRef<Path>,
    ) -> Result<Self> {
        Ok(Self::new(
            TransactionTable::from_csv(transactions_path)?,
            BoundaryTable::from_geojson_file(boundaries_path)?,
        ))
    }
}
