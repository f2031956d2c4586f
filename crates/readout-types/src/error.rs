// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Readout Risk Kernel Error Hierarchy
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all Readout kernel failures.
///
/// Signal, gate and score evaluation never produce one of these: missing
/// inputs degrade to a not-fired result and numerics are clamped. Errors
/// only arise at the configuration and calibration-artifact boundaries.
#[derive(Error, Debug)]
pub enum ReadoutError {
    /// Engine configuration failed validation or could not be parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Caller-supplied input violates a documented precondition.
    #[error("validation error: {0}")]
    Validation(String),

    /// Historical calibration could not be fitted or applied.
    #[error("calibration error: {0}")]
    Calibration(String),

    /// A calibration document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A calibration document declares a schema this build does not read.
    #[error("unsupported calibration schema: found {found}, expected {expected}")]
    UnsupportedSchema { found: String, expected: String },

    /// Reading or writing a calibration artifact failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl From<serde_json::Error> for ReadoutError {
    fn from(err: serde_json::Error) -> Self {
        ReadoutError::Serialization(err.to_string())
    }
}

pub type ReadoutResult<T> = Result<T, ReadoutError>;
