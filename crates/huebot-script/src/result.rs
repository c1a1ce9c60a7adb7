//! Run outcome

use crate::evaluator::LoopError;
use crate::gateway::GatewayError;
use crate::resolver::ResolveError;
use huebot_core::ProgramError;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use ulid::Ulid;

/// Exit code for a run stopped by its caller
pub const EXIT_CANCELLED: i32 = 130;

/// Terminal status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step ran; device failures may still be recorded
    Completed,
    /// Stopped by the cancellation token
    Cancelled,
    /// Stopped by a configuration or gateway-fatal error
    Fatal,
}

/// Non-fatal failure of one device
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Unresolved(#[from] ResolveError),

    #[error(transparent)]
    Apply(#[from] GatewayError),

    #[error("no acknowledgement within {0:?}")]
    AckTimeout(Duration),

    #[error("acknowledgement channel closed")]
    AckDropped,
}

/// A device error and where it happened
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceFailure {
    /// Device label (`light:Desk`) or the unresolved reference
    pub device: String,
    /// Path of the transition
    pub step: String,
    pub error: DeviceError,
}

/// Error that stopped a run
#[derive(Debug, Clone, Error)]
pub enum RunError {
    #[error("invalid program: {}", summarize(.0))]
    InvalidProgram(Vec<ProgramError>),

    #[error("{path}: {source}")]
    Loop {
        path: String,
        #[source]
        source: LoopError,
    },

    #[error("{device}: {source}")]
    Gateway {
        device: String,
        #[source]
        source: GatewayError,
    },
}

fn summarize(errors: &[ProgramError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Ulid,
    pub status: RunStatus,
    pub failures: Vec<DeviceFailure>,
    pub fatal: Option<RunError>,
}

impl RunResult {
    /// Device errors grouped by device label
    pub fn per_device_errors(&self) -> BTreeMap<&str, Vec<&DeviceError>> {
        let mut grouped: BTreeMap<&str, Vec<&DeviceError>> = BTreeMap::new();
        for failure in &self.failures {
            grouped
                .entry(failure.device.as_str())
                .or_default()
                .push(&failure.error);
        }
        grouped
    }

    /// Completed with no device errors
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed && self.failures.is_empty()
    }

    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::Cancelled => EXIT_CANCELLED,
            _ if self.is_success() => 0,
            _ => 1,
        }
    }
}
