//! Hue v1 wire format

use huebot_core::{Brightness, DeviceState};
use huebot_script::{Device, DeviceKind, GatewayError};
use serde_json::{json, Map, Value};

/// Hue error type for an unknown or revoked username
const ERROR_UNAUTHORIZED_USER: u64 = 1;

/// JSON body for a state change
///
/// Unset fields are omitted so the bridge leaves them alone. `transitiontime`
/// is always sent so the fade length the interpreter assumes matches the
/// device.
pub fn hue_body(state: &DeviceState) -> Value {
    let mut body = Map::new();

    if let Some(on) = state.on {
        body.insert("on".into(), json!(on));
    }
    match state.bri {
        Some(Brightness::Level(level)) => {
            body.insert("bri".into(), json!(level));
        }
        Some(Brightness::Increment(step)) => {
            body.insert("bri_inc".into(), json!(step));
        }
        None => {}
    }
    if let Some(hue) = state.hue {
        body.insert("hue".into(), json!(hue));
    }
    if let Some(sat) = state.sat {
        body.insert("sat".into(), json!(sat));
    }
    if let Some(xy) = state.xy {
        body.insert("xy".into(), json!(xy));
    }
    if let Some(ct) = state.mireds() {
        body.insert("ct".into(), json!(ct));
    }
    body.insert(
        "transitiontime".into(),
        json!(state.transition_deciseconds()),
    );

    Value::Object(body)
}

/// Path below `/api/<username>` that accepts state for a device
pub fn endpoint(device: &Device) -> String {
    match device.kind {
        DeviceKind::Light => format!("lights/{}/state", device.id),
        DeviceKind::Group => format!("groups/{}/action", device.id),
    }
}

/// Map a bridge reply to success or a gateway error
///
/// The bridge answers `200` with a list of `{"success": ...}` and
/// `{"error": {"type", "address", "description"}}` entries; any error entry
/// fails the apply.
pub fn parse_response(status: u16, body: &str) -> Result<(), GatewayError> {
    match status {
        401 | 403 => return Err(GatewayError::Unauthorized(format!("HTTP {}", status))),
        200..=299 => {}
        500..=599 => return Err(GatewayError::Transport(format!("HTTP {}", status))),
        _ => return Err(GatewayError::Rejected(format!("HTTP {}", status))),
    }

    let entries: Vec<Value> = match serde_json::from_str(body) {
        Ok(Value::Array(entries)) => entries,
        Ok(other) => vec![other],
        Err(e) => {
            return Err(GatewayError::Transport(format!(
                "invalid bridge response: {}",
                e
            )))
        }
    };

    let mut rejected = Vec::new();
    for error in entries.iter().filter_map(|entry| entry.get("error")) {
        let kind = error.get("type").and_then(Value::as_u64).unwrap_or(0);
        let description = error
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");

        if kind == ERROR_UNAUTHORIZED_USER {
            return Err(GatewayError::Unauthorized(description.to_string()));
        }
        match error.get("address").and_then(Value::as_str) {
            Some(address) => rejected.push(format!("{}: {}", address, description)),
            None => rejected.push(description.to_string()),
        }
    }

    if rejected.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::Rejected(rejected.join("; ")))
    }
}
