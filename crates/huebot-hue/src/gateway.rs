//! HTTP gateway to a Hue bridge

use crate::body::{endpoint, hue_body, parse_response};
use async_trait::async_trait;
use huebot_config::BridgeConfig;
use huebot_core::DeviceState;
use huebot_script::{Device, DeviceGateway, Dispatch, GatewayError};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

/// Errors constructing a [`HueGateway`]
#[derive(Debug, Error)]
pub enum HueError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Gateway that PUTs device state to a bridge over its v1 REST API
///
/// A successful PUT is acknowledged once the requested fade has had time to
/// finish, so `wait` transitions hold until the device has settled.
#[derive(Debug, Clone)]
pub struct HueGateway {
    client: Client,
    api_url: String,
}

impl HueGateway {
    pub fn new(config: &BridgeConfig) -> Result<Self, HueError> {
        // Bridges live on the LAN
        let client = Client::builder()
            .timeout(config.request_timeout)
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url(),
        })
    }

    /// Base URL including the username
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Full URL for a device's state endpoint
    pub fn url_for(&self, device: &Device) -> String {
        format!("{}/{}", self.api_url, endpoint(device))
    }
}

fn transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::Unreachable(e.to_string())
    } else {
        GatewayError::Transport(e.to_string())
    }
}

#[async_trait]
impl DeviceGateway for HueGateway {
    #[instrument(skip(self, state), fields(device = %device))]
    async fn apply(&self, device: &Device, state: &DeviceState) -> Result<Dispatch, GatewayError> {
        let url = self.url_for(device);
        let body = hue_body(state);
        debug!(%url, %body, "PUT state");

        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;
        if let Err(e) = parse_response(status, &text) {
            warn!(status, error = %e, "Bridge refused state");
            return Err(e);
        }

        let fade = state.transition_duration();
        if fade.is_zero() {
            return Ok(Dispatch::Done);
        }

        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::time::sleep(fade).await;
            let _ = tx.send(Ok(()));
        });
        Ok(Dispatch::Pending(rx))
    }
}
