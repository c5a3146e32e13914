//! Map view: joins unit aggregates to boundary polygons and emits a
//! declarative deck.gl-style description (view state, one GeoJSON layer,
//! tooltip template).
//!
//! Nothing is rendered here. The host hands the serialized view to its map
//! backend. Units with no boundary polygon are dropped from the view; the
//! boundary file does not cover every historical unit id.

use std::collections::BTreeMap;

use geojson::{Feature, FeatureCollection, JsonObject, JsonValue};
use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::aggregation::UnitAggregate;
use crate::config::{DashboardConfig, Rgb, PALETTE_SIZE};
use crate::dataset::BoundaryTable;
use crate::error::Result;
use crate::filter::{BaseMap, MapProjection};
use crate::metric::{AggregationKind, MetricDescriptor};
use crate::schema::{aggregates, boundaries, features, transactions};

const MAP_PROVIDER: &str = "mapbox";
const SEPARATOR_HTML: &str =
    "<hr style='margin: 10px auto; opacity:0.5; border-top: 2px solid white; width:85%'>";

// ── Output types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub map_provider: String,
    pub map_style: String,
    pub projection: MapProjection,
    pub view_state: ViewState,
    pub layer: GeoJsonLayer,
    pub tooltip: Tooltip,
    /// Aggregated units dropped for lack of a boundary polygon.
    pub unmatched_units: usize,
    #[serde(skip)]
    pub rows: Vec<MapRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewState {
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoJsonLayer {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: FeatureCollection,
    pub pickable: bool,
    pub auto_highlight: bool,
    pub highlight_color: [u8; 4],
    pub opacity: f64,
    pub stroked: bool,
    pub filled: bool,
    pub extruded: bool,
    pub wireframe: bool,
    pub get_fill_color: String,
    pub get_line_color: LineColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get_elevation: Option<String>,
    pub line_width_min_pixels: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LineColor {
    Fixed([u8; 4]),
    Accessor(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub html: String,
    pub style: BTreeMap<String, String>,
}

/// One joined unit, in `GEOID` order.
#[derive(Debug, Clone, PartialEq)]
pub struct MapRow {
    pub geoid: String,
    pub sub_geo: Option<String>,
    pub value: Option<f64>,
    pub sales: u32,
    /// Index into the palette; `None` when the value is undefined.
    pub bucket: Option<usize>,
    pub boundary_idx: usize,
}

// ── Colour scale ────────────────────────────────────────────────────────────

/// Equal-width bins over the observed value range.
///
/// Bin `i` covers `(e_i, e_{i+1}]`; the lowest bin also holds the minimum.
/// A single distinct value widens the range by 0.1% each side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    edges: [f64; PALETTE_SIZE + 1],
}

impl ColorScale {
    /// `None` when there is no finite value to scale.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (mut lo, mut hi) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;

        if lo == hi {
            let adj = if lo != 0.0 { lo.abs() * 0.001 } else { 0.001 };
            lo -= adj;
            hi += adj;
        }

        let width = (hi - lo) / PALETTE_SIZE as f64;
        let mut edges = [0.0; PALETTE_SIZE + 1];
        for (i, edge) in edges.iter_mut().enumerate() {
            *edge = lo + width * i as f64;
        }
        edges[PALETTE_SIZE] = hi;
        Some(Self { edges })
    }

    pub fn edges(&self) -> &[f64; PALETTE_SIZE + 1] {
        &self.edges
    }

    pub fn bucket(&self, value: f64) -> usize {
        self.edges[1..]
            .iter()
            .position(|&upper| value <= upper)
            .unwrap_or(PALETTE_SIZE - 1)
    }
}

// ── Building ────────────────────────────────────────────────────────────────

/// Inner-join the aggregate to the boundaries, ordered by unit id.
pub fn join_boundaries(agg: &UnitAggregate, polygons: &BoundaryTable) -> Result<Vec<MapRow>> {
    let joined = agg
        .frame()
        .clone()
        .lazy()
        .join(
            polygons.frame().clone().lazy(),
            [col(transactions::GEOID)],
            [col(boundaries::GEOID)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let geoids = joined.column(transactions::GEOID)?.str()?;
    let values = joined.column(aggregates::METRIC_VALUE)?.f64()?;
    let sales = joined.column(aggregates::SALES)?.u32()?;
    let labels = joined.column(transactions::SUB_GEO)?.str()?;
    let idx = joined.column(boundaries::BOUNDARY_IDX)?.u32()?;

    let mut rows = Vec::with_capacity(joined.height());
    for i in 0..joined.height() {
        let (Some(geoid), Some(boundary_idx)) = (geoids.get(i), idx.get(i)) else {
            continue;
        };
        rows.push(MapRow {
            geoid: geoid.to_string(),
            sub_geo: labels.get(i).map(str::to_string),
            value: values.get(i),
            sales: sales.get(i).unwrap_or(0),
            bucket: None,
            boundary_idx: boundary_idx as usize,
        });
    }
    rows.sort_by(|a, b| a.geoid.cmp(&b.geoid));
    Ok(rows)
}

pub fn build(
    agg: &UnitAggregate,
    polygons: &BoundaryTable,
    metric: &MetricDescriptor,
    projection: MapProjection,
    base_map: BaseMap,
    config: &DashboardConfig,
) -> Result<MapView> {
    let palette = config.palette_rgb()?;
    // extrusion is only meaningful for price-like metrics
    let projection = if metric.extrudable {
        projection
    } else {
        MapProjection::Flat
    };

    let mut rows = join_boundaries(agg, polygons)?;
    let unmatched_units = agg.height().saturating_sub(rows.len());
    if unmatched_units > 0 {
        debug!(unmatched_units, "units without boundary dropped from map");
    }

    let scale = ColorScale::from_values(rows.iter().filter_map(|r| r.value));
    for row in &mut rows {
        row.bucket = match (scale, row.value) {
            (Some(scale), Some(v)) if v.is_finite() => Some(scale.bucket(v)),
            _ => None,
        };
    }

    let collection = FeatureCollection {
        bbox: None,
        features: rows
            .iter()
            .map(|row| feature(row, polygons, metric, projection, &palette, config))
            .collect(),
        foreign_members: None,
    };

    Ok(MapView {
        map_provider: MAP_PROVIDER.to_string(),
        map_style: base_map.style().to_string(),
        projection,
        view_state: view_state(projection, config),
        layer: layer(projection, collection),
        tooltip: tooltip(projection, metric),
        unmatched_units,
        rows,
    })
}

fn feature(
    row: &MapRow,
    polygons: &BoundaryTable,
    metric: &MetricDescriptor,
    projection: MapProjection,
    palette: &[Rgb; PALETTE_SIZE],
    config: &DashboardConfig,
) -> Feature {
    let mut props = JsonObject::new();
    props.insert(features::GEOID.into(), JsonValue::from(row.geoid.clone()));
    props.insert(features::SUB_GEO.into(), JsonValue::from(row.sub_geo.clone()));
    props.insert(features::METRIC_VALUE.into(), JsonValue::from(row.value));
    props.insert(features::SALES.into(), JsonValue::from(row.sales));
    props.insert(features::VAR_FORMATTED.into(), JsonValue::from(metric.format(row.value)));
    props.insert(features::VAR_LABEL.into(), JsonValue::from(metric.label.clone()));
    props.insert(
        features::CHORO_COLOR.into(),
        match row.bucket {
            Some(b) => JsonValue::from(palette[b].to_vec()),
            None => JsonValue::Null,
        },
    );
    if projection == MapProjection::Extruded {
        props.insert(
            features::ELEVATION.into(),
            JsonValue::from(f64::from(row.sales) * config.map.elevation_scale),
        );
    }

    Feature {
        bbox: None,
        geometry: polygons.geometry(row.boundary_idx).cloned(),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn view_state(projection: MapProjection, config: &DashboardConfig) -> ViewState {
    let map = &config.map;
    let (zoom, pitch) = match projection {
        MapProjection::Flat => (map.zoom_2d, 0.0),
        MapProjection::Extruded => (map.zoom_3d, map.pitch_3d),
    };
    ViewState {
        latitude: map.latitude,
        longitude: map.longitude,
        zoom,
        min_zoom: map.min_zoom,
        max_zoom: map.max_zoom,
        pitch,
        bearing: 0.0,
        height: map.height,
    }
}

fn accessor(property: &str) -> String {
    format!("properties.{property}")
}

fn layer(projection: MapProjection, data: FeatureCollection) -> GeoJsonLayer {
    let extruded = projection == MapProjection::Extruded;
    GeoJsonLayer {
        kind: "GeoJsonLayer".to_string(),
        data,
        pickable: true,
        auto_highlight: true,
        highlight_color: if extruded {
            [255, 255, 255, 90]
        } else {
            [255, 255, 255, 128]
        },
        opacity: 0.5,
        stroked: !extruded,
        filled: true,
        extruded,
        wireframe: false,
        get_fill_color: accessor(features::CHORO_COLOR),
        get_line_color: if extruded {
            LineColor::Accessor(accessor(features::CHORO_COLOR))
        } else {
            LineColor::Fixed([255, 255, 255, 50])
        },
        get_elevation: extruded.then(|| accessor(features::ELEVATION)),
        line_width_min_pixels: 1,
    }
}

fn field(property: &str) -> String {
    format!("{{properties.{property}}}")
}

fn tooltip(projection: MapProjection, metric: &MetricDescriptor) -> Tooltip {
    let mut html = format!(
        "{}: <b>{}</b>",
        field(features::VAR_LABEL),
        field(features::VAR_FORMATTED)
    );
    // a count metric already is the sale count
    if projection == MapProjection::Extruded || metric.aggregation != AggregationKind::Count {
        html.push_str(&format!("<br>Total sales: <b>{}</b>", field(features::SALES)));
    }
    html.push_str(SEPARATOR_HTML);
    html.push_str(&format!(
        "Census Tract {} <br>{}",
        field(features::GEOID),
        field(features::SUB_GEO)
    ));

    let style = [
        ("background", "rgba(2,43,58,0.7)"),
        ("border", "1px solid white"),
        ("color", "white"),
        ("font-family", "Helvetica"),
        ("text-align", "center"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Tooltip { html, style }
}
