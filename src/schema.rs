/// Column-name constants for the housing-trends tables.
/// Single source of truth - exported to Python via PyO3.

// ── Transaction columns ─────────────────────────────────────────────────────
pub mod transactions {
    pub const YEAR: &str = "year";
    pub const YEAR_MONTH: &str = "year-month";
    pub const MONTH: &str = "month";
    pub const YEAR_BUILT: &str = "YearBuilt";
    pub const TRANSFER_AMOUNT: &str = "TransferAmount";
    pub const PRICE_SF: &str = "price_sf";
    pub const AREA_GROSS: &str = "AreaGross";
    pub const GEOID: &str = "GEOID";
    pub const SUB_GEO: &str = "Sub_geo";

    pub const INTEGER: [&str; 3] = [YEAR, MONTH, YEAR_BUILT];
    pub const FLOAT: [&str; 3] = [TRANSFER_AMOUNT, PRICE_SF, AREA_GROSS];
    pub const TEXT: [&str; 3] = [YEAR_MONTH, GEOID, SUB_GEO];

    pub const ALL: [&str; 9] = [
        YEAR,
        YEAR_MONTH,
        MONTH,
        YEAR_BUILT,
        TRANSFER_AMOUNT,
        PRICE_SF,
        AREA_GROSS,
        GEOID,
        SUB_GEO,
    ];
}

// ── Boundary columns ────────────────────────────────────────────────────────
pub mod boundaries {
    pub const GEOID: &str = "GEOID";
    pub const BOUNDARY_IDX: &str = "boundary_idx";
}

// ── Aggregate columns ───────────────────────────────────────────────────────
pub mod aggregates {
    pub const METRIC_VALUE: &str = "metric_value";
    pub const SALES: &str = "sales";
}

// ── Map feature properties ──────────────────────────────────────────────────
pub mod features {
    pub const GEOID: &str = "GEOID";
    pub const SUB_GEO: &str = "Sub_geo";
    pub const METRIC_VALUE: &str = "metric_value";
    pub const SALES: &str = "sales";
    pub const VAR_FORMATTED: &str = "var_formatted";
    pub const VAR_LABEL: &str = "dashboard_var_label";
    pub const CHORO_COLOR: &str = "choro_color";
    pub const ELEVATION: &str = "elevation";
}
