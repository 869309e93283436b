use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("GET {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("CSV parsing failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV header repeats column '{0}'")]
    DuplicateColumn(String),

    #[error("CSV rows do not match the header: {0}")]
    InconsistentHeader(String),

    #[error("CSV line {line} has {found} fields, header has {expected}")]
    InconsistentRow {
        line: u64,
        expected: usize,
        found: usize,
    },
}

#[derive(Error, Debug)]
pub enum WarehouseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Row {row} has no value for warehouse column '{column}'")]
    MissingColumn { column: String, row: usize },

    #[error("Row {row} column '{column}' is not a number: {value:?}")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("No such table: {0}")]
    NoSuchTable(String),

    #[error("Stored rows do not match the table columns: {0}")]
    InconsistentColumns(String),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Cannot convert column '{column}' at row {row} to a number: {value:?}")]
    Conversion {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Divisor column '{column}' is zero at row {row}")]
    DivideByZero { column: String, row: usize },

    #[error("Table has no rows to read column '{column}' from")]
    EmptyTable { column: String },

    #[error("Row {row} has columns {found:?}, expected {expected:?}")]
    Schema {
        row: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wraps an error with the name of the step that raised it.
    pub fn in_step(self, step: &'static str) -> Self {
        PipelineError::Step {
            step,
            source: Box::new(self),
        }
    }

    /// Name of the failing step, if the error came out of the pipeline driver.
    pub fn step(&self) -> Option<&'static str> {
        match self {
            PipelineError::Step { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// The innermost error, with step wrappers peeled off.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Step { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short machine-readable kind, surfaced alongside the step name.
    pub fn kind(&self) -> &'static str {
        match self.root() {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Conversion { .. } => "conversion",
            PipelineError::DivideByZero { .. } => "divide_by_zero",
            PipelineError::EmptyTable { .. } => "empty_table",
            PipelineError::Schema { .. } => "schema",
            PipelineError::Warehouse(_) => "warehouse",
            PipelineError::Config(_) => "config",
            PipelineError::Step { .. } => "step",
        }
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(err: toml::de::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
