//! Typed error surface for the loader and configuration boundaries.
//!
//! Per the error handling design, these are the only two sources of fatal
//! errors in the crate: the dispatch engine and the tick loop never raise,
//! they defer or reject bids instead (see [`crate::dispatch`]).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed row {row} in {file}: {source}")]
    Csv {
        file: String,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("malformed {field}: {value:?}")]
    MalformedTime { field: &'static str, value: String },

    #[error("unknown vehicle type {0:?}, expected motorbike/bike/car")]
    UnknownVehicleType(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {field} must be {constraint}, got {value}")]
    OutOfRange {
        field: &'static str,
        constraint: &'static str,
        value: String,
    },
}
