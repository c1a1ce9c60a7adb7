//! Philips Hue bridge gateway for huebot
//!
//! Implements [`huebot_script::DeviceGateway`] over the bridge's v1 REST API.

mod body;
mod gateway;

pub use body::{endpoint, hue_body, parse_response};
pub use gateway::{HueError, HueGateway};
