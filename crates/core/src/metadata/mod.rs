//! Artifact metadata source.
//!
//! Records are read from a flat CSV export, one firmware image per row.

mod csv_source;

pub use csv_source::{parse_records, read_records};

use thiserror::Error;

/// Errors that can occur while reading metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("Failed to open metadata file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid release date {value:?} on line {line} (expected YYYY-MM-DD)")]
    InvalidDate { line: u64, value: String },

    #[error("Missing {field} on line {line}")]
    MissingField { line: u64, field: &'static str },

    #[error("Location {value:?} on line {line} points outside the artifact root")]
    UnsafePath { line: u64, value: String },
}
