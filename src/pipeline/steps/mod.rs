// Pipeline steps, each a plain function over tables

pub mod aggregate;
pub mod fetch;
pub mod normalize;
pub mod report;

pub use aggregate::max_by_column;
pub use fetch::{fetch_table, parse_csv};
pub use normalize::{normalize, normalize_into, NormalizationSpec};
pub use report::Report;
