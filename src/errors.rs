//! Errors for rover store
use thiserror::Error;

/// Reason a single value was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("value is empty")]
    Empty,

    #[error("`{0}` is not a plain decimal number")]
    Malformed(String),

    #[error("`{value}` has {digits} integer digits, at most {max} allowed")]
    IntegerDigits { value: String, digits: usize, max: u32 },

    #[error("`{value}` has {digits} decimal places, at most {max} allowed")]
    DecimalPlaces { value: String, digits: usize, max: u32 },

    #[error("{0} is not a finite number")]
    NonFinite(f64),

    #[error("{value} is outside the range {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MigrationError {
    #[error("Duplicate migration name: {0}")]
    DuplicateName(String),

    #[error("Migration {name} must depend on {expected:?}, found {found:?}")]
    BrokenChain {
        name: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("Table {0} already exists")]
    TableExists(String),

    #[error("Unknown table {0}")]
    UnknownTable(String),

    #[error("Unknown field {table}.{field}")]
    UnknownField { table: String, field: String },

    #[error("Applied migration {0} is not part of the migration log")]
    UnknownApplied(String),

    #[error("Applied migration {name} at position {position} is past the end of the migration log")]
    BeyondLog { name: String, position: usize },

    #[error("Applied migrations out of order: expected {expected}, found {found}")]
    OutOfOrder { expected: String, found: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    #[error("Height map of {0} bytes is not a square grid of 16-bit samples")]
    InvalidGrid(usize),

    #[error("Position ({lat}, {lon}) is outside tile {tile}")]
    OutsideTile { lat: f64, lon: f64, tile: String },

    #[error("Position ({lat}, {lon}) is not on earth")]
    InvalidPosition { lat: f64, lon: f64 },
}

#[derive(Error, Debug)]
pub enum RoverError {
    #[error("Validation error on {field}: {source}")]
    Validation {
        field: &'static str,
        #[source]
        source: ValueError,
    },

    #[error("Persistence error")]
    Persistence(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    #[error("Rover {0} not found")]
    RoverNotFound(i64),

    #[error("Configuration error")]
    ConfigError(#[from] config::ConfigError),

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Terrain error: {0}")]
    Terrain(#[from] TerrainError),
}

impl RoverError {
    pub(crate) fn validation(field: &'static str, source: ValueError) -> Self {
        RoverError::Validation { field, source }
    }
}
