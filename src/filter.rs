//! User filter state and the row predicate built from it.

use std::fmt;
use std::str::FromStr;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DashboardConfig;
use crate::dataset::TransactionTable;
use crate::error::{DashError, Result};
use crate::schema::transactions;

// ── Filter inputs ───────────────────────────────────────────────────────────

/// Inclusive transaction-year range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    pub fn single(year: i32) -> Self {
        Self::new(year, year)
    }

    pub fn is_single_year(&self) -> bool {
        self.start == self.end
    }
}

/// Construction-year buckets offered by the "Year built" slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VintageBand {
    #[serde(rename = "<2000")]
    Before2000,
    #[serde(rename = "2000-2010")]
    From2000To2010,
    #[serde(rename = "2011-2023")]
    Since2011,
}

impl VintageBand {
    pub const ALL: [VintageBand; 3] = [
        VintageBand::Before2000,
        VintageBand::From2000To2010,
        VintageBand::Since2011,
    ];

    /// Inclusive construction-year bounds.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            VintageBand::Before2000 => (0, 1999),
            VintageBand::From2000To2010 => (2000, 2010),
            VintageBand::Since2011 => (2011, 2050),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VintageBand::Before2000 => "<2000",
            VintageBand::From2000To2010 => "2000-2010",
            VintageBand::Since2011 => "2011-2023",
        }
    }
}

impl FromStr for VintageBand {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        VintageBand::ALL
            .into_iter()
            .find(|b| b.label() == s.trim())
            .ok_or_else(|| DashError::InvalidFilter(format!("unknown vintage band '{s}'")))
    }
}

impl fmt::Display for VintageBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Band range chosen on the slider; covers `start.lo ..= end.hi`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VintageRange {
    pub start: VintageBand,
    pub end: VintageBand,
}

impl VintageRange {
    pub fn new(start: VintageBand, end: VintageBand) -> Self {
        Self { start, end }
    }

    /// Every construction year the dataset can hold.
    pub fn all() -> Self {
        Self::new(VintageBand::Before2000, VintageBand::Since2011)
    }

    pub fn bounds(&self) -> (i64, i64) {
        (self.start.bounds().0, self.end.bounds().1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionSelection {
    /// No sub-region predicate at all.
    EntireCounty,
    /// Keep rows whose `Sub_geo` is one of these names.
    Subset(Vec<String>),
}

impl RegionSelection {
    /// Selected names, or `None` when the whole county is in view.
    pub fn names(&self) -> Option<&[String]> {
        match self {
            RegionSelection::EntireCounty => None,
            RegionSelection::Subset(names) => Some(names),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapProjection {
    #[default]
    #[serde(rename = "2D")]
    Flat,
    #[serde(rename = "3D")]
    Extruded,
}

impl FromStr for MapProjection {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "2D" | "2d" => Ok(MapProjection::Flat),
            "3D" | "3d" => Ok(MapProjection::Extruded),
            other => Err(DashError::InvalidFilter(format!("unknown map view '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BaseMap {
    Dark,
    Light,
    Satellite,
    #[default]
    Streets,
}

impl BaseMap {
    /// Style name understood by the map provider.
    pub fn style(self) -> &'static str {
        match self {
            BaseMap::Streets => "road",
            BaseMap::Satellite => "satellite",
            BaseMap::Light => "light",
            BaseMap::Dark => "dark",
        }
    }
}

impl FromStr for BaseMap {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Dark" => Ok(BaseMap::Dark),
            "Light" => Ok(BaseMap::Light),
            "Satellite" => Ok(BaseMap::Satellite),
            "Streets" => Ok(BaseMap::Streets),
            other => Err(DashError::InvalidFilter(format!("unknown base map '{other}'"))),
        }
    }
}

// ── Filter state ────────────────────────────────────────────────────────────

/// Everything one interaction asks for. Built fresh from the UI each time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub years: YearRange,
    pub vintage: VintageRange,
    pub region: RegionSelection,
    /// Metric registry name, e.g. "Price (per SF)".
    pub metric: String,
    pub projection: MapProjection,
    pub base_map: BaseMap,
}

/// Which predicates apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    /// Year, vintage and region. Feeds the map and the KPIs.
    Selection,
    /// Vintage and region only. Feeds the chart, which always spans the
    /// full history.
    History,
}

impl FilterState {
    pub fn new(years: YearRange, metric: &str) -> Self {
        Self {
            years,
            vintage: VintageRange::all(),
            region: RegionSelection::EntireCounty,
            metric: metric.to_string(),
            projection: MapProjection::default(),
            base_map: BaseMap::default(),
        }
    }

    pub fn with_vintage(mut self, vintage: VintageRange) -> Self {
        self.vintage = vintage;
        self
    }

    pub fn with_region(mut self, region: RegionSelection) -> Self {
        self.region = region;
        self
    }

    pub fn with_projection(mut self, projection: MapProjection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_base_map(mut self, base_map: BaseMap) -> Self {
        self.base_map = base_map;
        self
    }

    /// Reject states the UI could never produce.
    pub fn validate(&self, config: &DashboardConfig) -> Result<()> {
        let YearRange { start, end } = self.years;
        for year in [start, end] {
            if !config.year_options.contains(&year) {
                return Err(DashError::InvalidFilter(format!(
                    "year {year} is not one of {:?}",
                    config.year_options
                )));
            }
        }
        if start > end {
            return Err(DashError::InvalidFilter(format!(
                "year range {start}..{end} is reversed"
            )));
        }
        if self.vintage.start > self.vintage.end {
            return Err(DashError::InvalidFilter(format!(
                "vintage range {}..{} is reversed",
                self.vintage.start, self.vintage.end
            )));
        }
        Ok(())
    }

    /// Conjunction of the predicates active in `scope`.
    pub fn predicate(&self, scope: FilterScope) -> Expr {
        let (built_lo, built_hi) = self.vintage.bounds();
        let mut predicate = col(transactions::YEAR_BUILT)
            .gt_eq(lit(built_lo))
            .and(col(transactions::YEAR_BUILT).lt_eq(lit(built_hi)));

        if scope == FilterScope::Selection {
            predicate = predicate.and(
                col(transactions::YEAR)
                    .gt_eq(lit(self.years.start as i64))
                    .and(col(transactions::YEAR).lt_eq(lit(self.years.end as i64))),
            );
        }

        if let Some(names) = self.region.names() {
            let names = Series::new(transactions::SUB_GEO.into(), names);
            predicate = predicate.and(col(transactions::SUB_GEO).is_in(lit(names), false));
        }

        predicate
    }
}

/// Rows of `table` that satisfy every predicate active in `scope`.
pub fn apply(
    table: &TransactionTable,
    filter: &FilterState,
    scope: FilterScope,
) -> Result<DataFrame> {
    let df = table
        .frame()
        .clone()
        .lazy()
        .filter(filter.predicate(scope))
        .collect()?;
    debug!(
        ?scope,
        rows = df.height(),
        of = table.height(),
        "filtered transactions"
    );
    Ok(df)
}

/// Rows of an already filtered frame sold in `year`.
pub fn rows_in_year(df: &DataFrame, year: i32) -> Result<DataFrame> {
    Ok(df
        .clone()
        .lazy()
        .filter(col(transactions::YEAR).eq(lit(year as i64)))
        .collect()?)
}
