mod common;

use common::*;
use housing_trends::aggregation;
use housing_trends::kpi::YearOverYear;
use housing_trends::metric::{PRICE_OVERALL, PRICE_PER_SF, TOTAL_SALES};
use housing_trends::schema::{features, transactions};
use housing_trends::{
    DashError, DashboardConfig, Dataset, FilterScope, FilterState, MapProjection, MetricRegistry,
    Pipeline, RegionSelection, VintageBand, VintageRange, YearRange,
};
use polars::prelude::*;

fn render(dataset: &Dataset, filter: &FilterState) -> housing_trends::DashboardView {
    let config = DashboardConfig::default();
    let metrics = MetricRegistry::default();
    Pipeline::new(dataset, &config, &metrics).render(filter).unwrap()
}

#[test]
fn single_year_sales_count() {
    let dataset = dataset();
    let filter = FilterState::new(YearRange::single(2022), TOTAL_SALES);
    let view = render(&dataset, &filter);

    let sales: Vec<u32> = view.map.rows.iter().map(|r| r.sales).collect();
    assert_eq!(sales, vec![4, 3, 3]);
    assert_eq!(sales.iter().sum::<u32>() as usize, rows_in_year(2022));
    assert_eq!(view.map.unmatched_units, 0);
    assert_eq!(view.map.rows[0].sub_geo.as_deref(), Some("Duluth"));

    assert_eq!(view.kpis.headline("Total sales").unwrap().formatted, "10");
    assert_eq!(view.kpis.headline("Median vintage").unwrap().formatted, "2006");
    assert!(matches!(view.kpis.year_over_year, YearOverYear::SingleYear { .. }));
    assert_eq!(view.title, "Gwinnett County Housing Trends | 2022 only");
}

#[test]
fn count_buckets_span_the_palette() {
    let view = render(&dataset(), &FilterState::new(YearRange::single(2022), TOTAL_SALES));
    let buckets: Vec<Option<usize>> = view.map.rows.iter().map(|r| r.bucket).collect();
    assert_eq!(buckets, vec![Some(3), Some(0), Some(0)]);

    let props = view.map.layer.data.features[0].properties.as_ref().unwrap();
    assert_eq!(props[features::CHORO_COLOR], serde_json::json!([2, 43, 58]));
    assert_eq!(props[features::VAR_FORMATTED], "4");
    assert!(!props.contains_key(features::ELEVATION));
}

#[test]
fn empty_region_selection_renders_placeholders() {
    let dataset = dataset();
    let filter = FilterState::new(YearRange::single(2022), PRICE_PER_SF).with_region(
        RegionSelection::Subset(vec!["Lawrenceville".into(), "NE Gwinnett".into()]),
    );
    let view = render(&dataset, &filter);

    assert!(view.map.rows.is_empty());
    assert!(view.map.layer.data.features.is_empty());
    assert!(view.chart.points.is_empty());
    assert_eq!(
        view.chart.title,
        "Lawrenceville & NE Gwinnett median price (per sf)"
    );
    assert_eq!(view.kpis.headline("Total sales").unwrap().formatted, "0");
    assert_eq!(view.kpis.headline("Median price (per SF)").unwrap().formatted, "N/A");
    assert_eq!(view.kpis.headline("Median size (SF)").unwrap().value, None);
}

#[test]
fn medians_and_year_over_year() {
    let dataset = dataset();
    let filter = FilterState::new(YearRange::new(2022, 2023), PRICE_PER_SF);
    let view = render(&dataset, &filter);

    let formatted: Vec<String> = view
        .map
        .layer
        .data
        .features
        .iter()
        .map(|f| {
            let props = f.properties.as_ref().unwrap();
            props[features::VAR_FORMATTED].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(formatted, vec!["$157.50", "$200.00", "$260.00"]);
    assert_eq!(view.map.unmatched_units, 1);

    let YearOverYear::Compared { label, deltas, primary } = &view.kpis.year_over_year else {
        panic!("expected a comparison");
    };
    assert_eq!(label, "2022 to 2023 change");
    assert_eq!(*primary, Some(1));
    let shown: Vec<&str> = deltas.iter().map(|d| d.formatted.as_str()).collect();
    assert_eq!(shown, vec!["-55.6%", "-11.1%", "-19.0%"]);
}

#[test]
fn tract_without_price_has_no_colour() {
    let rows: Vec<Row> = ROWS
        .iter()
        .map(|r| {
            let mut r = *r;
            if r.6 == SUWANEE_TRACT {
                r.4 = None;
            }
            r
        })
        .collect();
    let dataset = dataset_from_rows(&rows);
    let view = render(&dataset, &FilterState::new(YearRange::new(2022, 2024), PRICE_PER_SF));

    let buckets: Vec<Option<usize>> = view.map.rows.iter().map(|r| r.bucket).collect();
    assert_eq!(buckets, vec![Some(0), Some(3), None]);
    let suwanee = &view.map.rows[2];
    assert_eq!(suwanee.geoid, SUWANEE_TRACT);
    assert_eq!(suwanee.value, None);
    assert_eq!(suwanee.sales, 4);

    let props = view.map.layer.data.features[2].properties.as_ref().unwrap();
    assert_eq!(props[features::GEOID], SUWANEE_TRACT);
    assert_eq!(props[features::VAR_FORMATTED], "N/A");
    assert!(props[features::METRIC_VALUE].is_null());
    assert!(props[features::CHORO_COLOR].is_null());

    // the undefined tract does not stretch the scale: 157.5 and 200 are its ends
    let first = view.map.layer.data.features[0].properties.as_ref().unwrap();
    assert_eq!(first[features::CHORO_COLOR], serde_json::json!([151, 163, 171]));
}

#[test]
fn missing_start_year_gives_unavailable_deltas() {
    let view = render(&dataset(), &FilterState::new(YearRange::new(2021, 2023), PRICE_OVERALL));
    let YearOverYear::Compared { deltas, .. } = &view.kpis.year_over_year else {
        panic!("expected a comparison");
    };
    assert_eq!(deltas.len(), 3);
    assert!(deltas.iter().all(|d| d.value.is_none() && d.formatted == "N/A"));
}

#[test]
fn unmatched_units_are_dropped_from_map() {
    let dataset = dataset();
    let filter = FilterState::new(YearRange::new(2022, 2024), TOTAL_SALES);
    let view = render(&dataset, &filter);

    let filtered = filter_rows(&dataset, &filter);
    let distinct = filtered
        .column(transactions::GEOID)
        .unwrap()
        .n_unique()
        .unwrap();
    assert_eq!(distinct, 4);
    assert_eq!(view.map.rows.len(), 3);
    assert!(view.map.rows.iter().all(|r| r.geoid != ORPHAN_TRACT));
    assert_eq!(view.map.unmatched_units, 1);
}

#[test]
fn unit_sales_sum_to_filtered_rows() {
    let dataset = dataset();
    let registry = MetricRegistry::default();
    let filter = FilterState::new(YearRange::new(2022, 2024), TOTAL_SALES)
        .with_vintage(VintageRange::new(VintageBand::From2000To2010, VintageBand::Since2011));

    let filtered = filter_rows(&dataset, &filter);
    let metric = registry.resolve(TOTAL_SALES).unwrap();
    let agg = aggregation::aggregate_by_unit(&filtered, metric).unwrap();
    assert_eq!(agg.total_sales().unwrap() as usize, filtered.height());
}

#[test]
fn chart_covers_history_in_order() {
    let view = render(&dataset(), &FilterState::new(YearRange::single(2023), TOTAL_SALES));
    let chart = &view.chart;

    let xs: Vec<&str> = chart.points.iter().map(|p| p.x.as_str()).collect();
    assert_eq!(
        xs,
        vec![
            "2022-1", "2022-2", "2022-9", "2022-10", "2022-11", "2023-1", "2023-3", "2023-6",
            "2024-2"
        ]
    );
    let dates: Vec<_> = chart.points.iter().map(|p| p.date.unwrap()).collect();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));

    assert_eq!(chart.markers[0].x, "2023-1");
    assert_eq!(chart.markers[1].x, "2023-12");
    assert_eq!(chart.title, "Countywide total sales");
    assert_eq!(chart.points.iter().filter_map(|p| p.y).sum::<f64>(), 15.0);
}

#[test]
fn extrusion_only_for_price_metrics() {
    let dataset = dataset();
    let price = render(
        &dataset,
        &FilterState::new(YearRange::single(2022), PRICE_OVERALL)
            .with_projection(MapProjection::Extruded),
    );
    assert_eq!(price.map.projection, MapProjection::Extruded);
    assert!(price.map.layer.extruded);
    assert_eq!(price.map.view_state.pitch, 45.0);
    let props = price.map.layer.data.features[0].properties.as_ref().unwrap();
    assert_eq!(props[features::ELEVATION], serde_json::json!(100.0));
    assert!(price.map.tooltip.html.contains("Total sales"));

    let count = render(
        &dataset,
        &FilterState::new(YearRange::single(2022), TOTAL_SALES)
            .with_projection(MapProjection::Extruded),
    );
    assert_eq!(count.map.projection, MapProjection::Flat);
    assert!(!count.map.layer.extruded);
    assert_eq!(count.map.view_state.pitch, 0.0);
}

#[test]
fn render_is_idempotent() {
    let dataset = dataset();
    let filter = FilterState::new(YearRange::new(2022, 2024), PRICE_PER_SF)
        .with_region(RegionSelection::Subset(vec!["Duluth".into(), "Suwanee".into()]));
    let first = render(&dataset, &filter);
    let second = render(&dataset, &filter);
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn serialized_view_shape() {
    let view = render(&dataset(), &FilterState::new(YearRange::single(2022), PRICE_PER_SF));
    let json: serde_json::Value = serde_json::from_str(&view.to_json().unwrap()).unwrap();

    assert_eq!(json["metric"], "Price (per SF)");
    assert_eq!(json["map"]["map_style"], "road");
    assert_eq!(json["map"]["projection"], "2D");
    assert_eq!(json["map"]["layer"]["type"], "GeoJsonLayer");
    assert_eq!(json["map"]["layer"]["data"]["type"], "FeatureCollection");
    assert!(json["map"].get("rows").is_none());
    assert_eq!(json["kpis"]["year_over_year"]["state"], "single_year");
    assert_eq!(json["chart"]["points"][0]["date"], "2022-01-01");
}

#[test]
fn rejects_bad_requests() {
    let dataset = dataset();
    let config = DashboardConfig::default();
    let metrics = MetricRegistry::default();
    let pipeline = Pipeline::new(&dataset, &config, &metrics);

    let unknown = FilterState::new(YearRange::single(2022), "Days on market");
    assert!(matches!(pipeline.render(&unknown), Err(DashError::UnknownMetric(_))));

    let out_of_range = FilterState::new(YearRange::new(2019, 2022), TOTAL_SALES);
    assert!(matches!(pipeline.render(&out_of_range), Err(DashError::InvalidFilter(_))));
}

#[test]
fn loads_from_files_like_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let (csv, geojson) = write_fixture_files(dir.path());
    let loaded = Dataset::load(&csv, &geojson).unwrap();

    assert_eq!(loaded.transactions.height(), ROWS.len());
    assert_eq!(loaded.boundaries.len(), 3);

    let filter = FilterState::new(YearRange::new(2022, 2023), PRICE_OVERALL);
    assert_eq!(
        render(&loaded, &filter).to_json().unwrap(),
        render(&dataset(), &filter).to_json().unwrap()
    );
}

fn filter_rows(dataset: &Dataset, filter: &FilterState) -> DataFrame {
    housing_trends::filter::apply(&dataset.transactions, filter, FilterScope::Selection).unwrap()
}
