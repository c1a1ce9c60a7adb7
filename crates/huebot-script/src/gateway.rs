//! Device gateway port
//!
//! The gateway is the only thing that talks to hardware. It must accept
//! concurrent `apply` calls for distinct devices; the interpreter never has two
//! applies in flight for the same device within one transition.

use async_trait::async_trait;
use huebot_core::DeviceState;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;

/// Kind of addressable device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Light,
    Group,
}

/// A concrete, gateway-addressable device
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Device {
    pub kind: DeviceKind,
    pub id: u32,
    pub name: String,
}

impl Device {
    pub fn light(id: u32, name: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::Light,
            id,
            name: name.into(),
        }
    }

    pub fn group(id: u32, name: impl Into<String>) -> Self {
        Self {
            kind: DeviceKind::Group,
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeviceKind::Light => write!(f, "light:{}", self.name),
            DeviceKind::Group => write!(f, "group:{}", self.name),
        }
    }
}

/// Errors reported by a gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The device or bridge refused the state
    #[error("rejected: {0}")]
    Rejected(String),

    /// The request did not complete in time
    #[error("request timed out")]
    Timeout,

    /// The bridge cannot be reached at all
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The bridge no longer accepts our credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Any other transport problem
    #[error("transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Whether the gateway can no longer serve any device
    pub fn is_fatal(&self) -> bool {
        matches!(self, GatewayError::Unreachable(_) | GatewayError::Unauthorized(_))
    }
}

/// Result of a successful dispatch
#[derive(Debug)]
pub enum Dispatch {
    /// Nothing further to wait for
    Done,
    /// The device will report completion on this channel
    Pending(oneshot::Receiver<Result<(), GatewayError>>),
}

/// Sends device states to hardware
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    async fn apply(&self, device: &Device, state: &DeviceState) -> Result<Dispatch, GatewayError>;
}
