use std::io;
use thiserror::Error;

/// Reasons a simulation request is turned away before any work is done
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Stake amount must be greater than zero")]
    NonPositiveAmount,

    #[error("Start date must not be after end date")]
    StartAfterEnd,

    #[error("Stake duration too short: {days} day(s), minimum is {minimum}")]
    DurationTooShort { days: i64, minimum: i64 },
}

// Custom error type for the projector
#[derive(Error, Debug)]
pub enum ProjectorError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Parameter error: {0}")]
    Parameters(String),

    #[error("Oracle fetch error: {0}")]
    OracleFetch(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// Type alias for Result with our custom error type
pub type Result<T> = std::result::Result<T, ProjectorError>;
