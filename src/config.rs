//! Dashboard configuration.
//!
//! Every field has a default matching the Gwinnett County deployment, so an
//! empty JSON object is a valid config file. Anything that fails
//! [`DashboardConfig::validate`] is a build/deploy defect and aborts startup.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// RGB triple as consumed by the map renderer.
pub type Rgb = [u8; 3];

pub const PALETTE_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// County name used in page and chart titles.
    pub county: String,
    /// Choropleth colours, lowest bucket first (lightest -> darkest).
    pub palette: Vec<String>,
    pub map: MapSettings,
    /// Selectable transaction years.
    pub year_options: Vec<i32>,
    /// Chart marker keys bracketing each selectable year.
    pub year_markers: BTreeMap<i32, YearMarkers>,
    /// Named sub-regions offered by the region multi-select.
    pub sub_regions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom_2d: f64,
    pub zoom_3d: f64,
    pub pitch_3d: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub height: u32,
    /// Extrusion height per sale in 3D mode.
    pub elevation_scale: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearMarkers {
    pub start: String,
    pub end: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            latitude: 33.95737878948156,
            longitude: -84.02506266471877,
            zoom_2d: 9.5,
            zoom_3d: 10.4,
            pitch_3d: 45.0,
            min_zoom: 8.0,
            max_zoom: 15.0,
            height: 575,
            elevation_scale: 25.0,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let year_options: Vec<i32> = (2020..=2024).collect();
        let year_markers = year_options
            .iter()
            .map(|&y| {
                // transactions stop in March 2024
                let end_month = if y == 2024 { 3 } else { 12 };
                (
                    y,
                    YearMarkers {
                        start: format!("{y}-1"),
                        end: format!("{y}-{end_month}"),
                    },
                )
            })
            .collect();

        Self {
            county: "Gwinnett".to_string(),
            palette: ["#97a3ab", "#667883", "#37505d", "#022b3a"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            map: MapSettings::default(),
            year_options,
            year_markers,
            sub_regions: [
                "Buford/Sugar Hill",
                "Dacula",
                "Duluth",
                "Lawrenceville",
                "Lilburn",
                "NE Gwinnett",
                "Norcross/Peachtree Corners",
                "Snellville/S. Gwinnett",
                "Suwanee",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl DashboardConfig {
    /// Load a JSON config file; missing keys fall back to defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.palette_rgb()?;

        if self.year_options.is_empty() {
            return Err(DashError::Configuration("year_options is empty".into()));
        }
        for year in &self.year_options {
            if !self.year_markers.contains_key(year) {
                return Err(DashError::Configuration(format!(
                    "no chart markers configured for year {year}"
                )));
            }
        }
        if !(self.map.elevation_scale > 0.0) {
            return Err(DashError::Configuration(format!(
                "elevation_scale must be positive, got {}",
                self.map.elevation_scale
            )));
        }
        if self.map.min_zoom > self.map.max_zoom {
            return Err(DashError::Configuration(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.map.min_zoom, self.map.max_zoom
            )));
        }
        Ok(())
    }

    /// Palette parsed to RGB, lowest bucket first.
    pub fn palette_rgb(&self) -> Result<[Rgb; PALETTE_SIZE]> {
        if self.palette.len() != PALETTE_SIZE {
            return Err(DashError::Configuration(format!(
                "palette must have exactly {PALETTE_SIZE} colours, got {}",
                self.palette.len()
            )));
        }
        let mut out = [[0u8; 3]; PALETTE_SIZE];
        for (slot, hex) in out.iter_mut().zip(&self.palette) {
            *slot = parse_hex(hex)?;
        }
        Ok(out)
    }

    pub fn markers_for(&self, year: i32) -> Result<&YearMarkers> {
        self.year_markers.get(&year).ok_or_else(|| {
            DashError::Configuration(format!("no chart markers configured for year {year}"))
        })
    }
}

fn parse_hex(hex: &str) -> Result<Rgb> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Err(DashError::Configuration(format!("invalid colour '{hex}'")));
    }
    let mut rgb = [0u8; 3];
    for (i, channel) in rgb.iter_mut().enumerate() {
        *channel = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
            .map_err(|_| DashError::Configuration(format!("invalid colour '{hex}'")))?;
    }
    Ok(rgb)
}
