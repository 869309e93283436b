//! Defaults for the cereal dataset. These mirror the public cereal CSV
//! and the warehouse layout its normalized form is stored in.

pub const DEFAULT_CEREAL_URL: &str = "https://docs.dagster.io/assets/cereal.csv";
pub const DEFAULT_WAREHOUSE_PATH: &str = "cereals.db";
pub const DEFAULT_TABLE_NAME: &str = "normalized_cereals";
pub const DEFAULT_CONFIG_PATH: &str = "cereal_pipeline.toml";

pub const NAME_COLUMN: &str = "name";
pub const CALORIES_COLUMN: &str = "calories";
pub const PROTEIN_COLUMN: &str = "protein";
pub const SERVING_SIZE_COLUMN: &str = "cups";

/// Columns rescaled per cup of cereal.
pub const NORMALIZED_COLUMNS: [&str; 10] = [
    "calories", "protein", "fat", "sodium", "fiber", "carbo", "sugars", "potass", "vitamins",
    "weight",
];

/// Header of the cereal CSV, in order.
pub const CEREAL_COLUMNS: [&str; 16] = [
    "name", "mfr", "type", "calories", "protein", "fat", "sodium", "fiber", "carbo", "sugars",
    "potass", "vitamins", "shelf", "weight", "cups", "rating",
];

/// Columns stored as text in the warehouse; the rest are real-valued.
pub const TEXT_COLUMNS: [&str; 3] = ["name", "mfr", "type"];

// Step names, surfaced in errors and tracing spans.
pub const STEP_FETCH: &str = "download_cereals";
pub const STEP_NORMALIZE: &str = "normalize_cereals";
pub const STEP_MAX_CALORIES: &str = "find_highest_calorie_cereal";
pub const STEP_MAX_PROTEIN: &str = "find_highest_protein_cereal";
pub const STEP_REPORT: &str = "display_results";
