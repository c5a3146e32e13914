#![allow(dead_code)]

use std::path::{Path, PathBuf};

use housing_trends::schema::transactions;
use housing_trends::{BoundaryTable, Dataset, TransactionTable};
use polars::prelude::*;

pub const DULUTH_TRACT: &str = "13135050100";
pub const DACULA_TRACT: &str = "13135050200";
pub const SUWANEE_TRACT: &str = "13135050300";
/// Has sales but no boundary polygon.
pub const ORPHAN_TRACT: &str = "13135999900";

/// (year, month, YearBuilt, TransferAmount, price_sf, AreaGross, GEOID, Sub_geo)
pub type Row = (i64, i64, i64, f64, Option<f64>, f64, &'static str, &'static str);

pub const ROWS: [Row; 15] = [
    // 2022: 10 sales across three tracts (4 / 3 / 3)
    (2022, 1, 1995, 300_000.0, Some(150.0), 2000.0, DULUTH_TRACT, "Duluth"),
    (2022, 2, 2004, 320_000.0, Some(160.0), 2000.0, DULUTH_TRACT, "Duluth"),
    (2022, 10, 2015, 450_000.0, Some(180.0), 2500.0, DULUTH_TRACT, "Duluth"),
    (2022, 9, 1988, 280_000.0, Some(140.0), 2000.0, DULUTH_TRACT, "Lilburn"),
    (2022, 1, 2001, 350_000.0, Some(175.0), 2000.0, DACULA_TRACT, "Dacula"),
    (2022, 11, 2012, 400_000.0, Some(200.0), 2000.0, DACULA_TRACT, "Dacula"),
    (2022, 2, 2019, 390_000.0, None, 2100.0, DACULA_TRACT, "Dacula"),
    (2022, 10, 2008, 500_000.0, Some(250.0), 2000.0, SUWANEE_TRACT, "Suwanee"),
    (2022, 9, 1999, 520_000.0, Some(260.0), 2000.0, SUWANEE_TRACT, "Suwanee"),
    (2022, 11, 2016, 610_000.0, Some(305.0), 2000.0, SUWANEE_TRACT, "Suwanee"),
    // 2023
    (2023, 3, 2010, 330_000.0, Some(165.0), 2000.0, DULUTH_TRACT, "Duluth"),
    (2023, 6, 1992, 310_000.0, Some(155.0), 2000.0, DULUTH_TRACT, "Duluth"),
    (2023, 1, 2021, 420_000.0, Some(210.0), 2000.0, DACULA_TRACT, "Dacula"),
    (2023, 6, 2000, 260_000.0, Some(130.0), 2000.0, ORPHAN_TRACT, "Lilburn"),
    // 2024
    (2024, 2, 2014, 540_000.0, Some(270.0), 2000.0, SUWANEE_TRACT, "Suwanee"),
];

pub fn rows_in_year(year: i64) -> usize {
    ROWS.iter().filter(|r| r.0 == year).count()
}

pub fn frame_from_rows(rows: &[Row]) -> DataFrame {
    let year_months: Vec<String> = rows.iter().map(|r| format!("{}-{}", r.0, r.1)).collect();
    df!(
        transactions::YEAR => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        transactions::YEAR_MONTH => year_months,
        transactions::MONTH => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        transactions::YEAR_BUILT => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        transactions::TRANSFER_AMOUNT => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        transactions::PRICE_SF => rows.iter().map(|r| r.4).collect::<Vec<_>>(),
        transactions::AREA_GROSS => rows.iter().map(|r| r.5).collect::<Vec<_>>(),
        transactions::GEOID => rows.iter().map(|r| r.6).collect::<Vec<_>>(),
        transactions::SUB_GEO => rows.iter().map(|r| r.7).collect::<Vec<_>>(),
    )
    .unwrap()
}

pub fn transactions_frame() -> DataFrame {
    frame_from_rows(&ROWS)
}

pub fn transactions() -> TransactionTable {
    TransactionTable::from_frame(transactions_frame()).unwrap()
}

fn square(lon: f64, lat: f64) -> String {
    format!(
        "[[[{lon}, {lat}], [{}, {lat}], [{}, {}], [{lon}, {}], [{lon}, {lat}]]]",
        lon + 0.05,
        lon + 0.05,
        lat + 0.05,
        lat + 0.05
    )
}

pub fn boundaries_geojson() -> String {
    let features: Vec<String> = [
        (DULUTH_TRACT, -84.15),
        (DACULA_TRACT, -83.90),
        (SUWANEE_TRACT, -84.07),
    ]
    .iter()
    .map(|(geoid, lon)| {
        format!(
            r#"{{"type": "Feature", "properties": {{"GEOID": "{geoid}"}}, "geometry": {{"type": "Polygon", "coordinates": {}}}}}"#,
            square(*lon, 33.95)
        )
    })
    .collect();
    format!(
        r#"{{"type": "FeatureCollection", "features": [{}]}}"#,
        features.join(", ")
    )
}

pub fn boundaries() -> BoundaryTable {
    BoundaryTable::from_geojson_str(&boundaries_geojson()).unwrap()
}

pub fn dataset() -> Dataset {
    Dataset::new(transactions(), boundaries())
}

/// Same boundaries, different transactions.
pub fn dataset_from_rows(rows: &[Row]) -> Dataset {
    let table = TransactionTable::from_frame(frame_from_rows(rows)).unwrap();
    Dataset::new(table, boundaries())
}

/// The fixture as it arrives from the assessor export: quoted thousands,
/// padded labels and an extra address column.
pub fn transactions_csv() -> String {
    let mut out = String::from(
        "year,year-month,month,YearBuilt,TransferAmount,price_sf,AreaGross,GEOID,Sub_geo,PropertyAddressFull\n",
    );
    for (i, r) in ROWS.iter().enumerate() {
        let price_sf = r.4.map(|v| v.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{}-{},{},{},\"{}\",{},\"{}\",{}, {} ,{} Main St\n",
            r.0,
            r.0,
            r.1,
            r.1,
            r.2,
            group_thousands(r.3 as i64),
            price_sf,
            group_thousands(r.5 as i64),
            r.6,
            r.7,
            i + 1
        ));
    }
    out
}

fn group_thousands(n: i64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Write the CSV and GeoJSON fixtures into `dir`.
pub fn write_fixture_files(dir: &Path) -> (PathBuf, PathBuf) {
    let csv = dir.join("transactions.csv");
    let geojson = dir.join("tracts.geojson");
    std::fs::write(&csv, transactions_csv()).unwrap();
    std::fs::write(&geojson, boundaries_geojson()).unwrap();
    (csv, geojson)
}
