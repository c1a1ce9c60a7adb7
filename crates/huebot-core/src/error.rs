//! Error types for program construction and validation

use thiserror::Error;

/// Result type for program operations
pub type ProgramResult<T> = Result<T, ProgramError>;

/// Configuration errors found in a program
///
/// Parse-level problems (bad brightness strings, device references) surface
/// while deserializing. Structural problems are collected by
/// [`Step::validate`](crate::Step::validate) and carry the path of the
/// offending step.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    #[error("invalid brightness '{0}': expected 0-254 or a signed step such as '+20'")]
    InvalidBrightness(String),

    #[error("invalid device reference '{0}'")]
    InvalidDeviceRef(String),

    #[error("loop may only use one of {modes}")]
    ConflictingLoopModes { modes: String },

    #[error("invalid deadline {field} '{value}'")]
    InvalidDeadline { field: &'static str, value: String },

    #[error("{path}: random range is inverted (min {min} > max {max})")]
    InvertedRange { path: String, min: f64, max: f64 },

    #[error("{path}: invalid time: {reason}")]
    InvalidTime { path: String, reason: String },

    #[error("{path}: invalid state: {reason}")]
    InvalidState { path: String, reason: String },

    #[error("{path}: '{kind}' requires at least one step")]
    EmptySteps { path: String, kind: &'static str },

    #[error("{path}: transition lists no devices")]
    EmptyDevices { path: String },
}
