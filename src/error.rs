//! Error types for Synheart Cycle
//!
//! The prediction engine itself never fails; these errors come from the edges
//! (payload parsing, store mutations, report encoding).

use thiserror::Error;

/// Errors that can occur while ingesting or encoding cycle data
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Duplicate record id: {0}")]
    DuplicateId(String),

    #[error("Unknown record id: {0}")]
    UnknownId(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
