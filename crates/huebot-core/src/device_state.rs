//! Device state
//!
//! A target configuration for a light or group. Fields are independent and
//! optional; a missing field leaves the device's current value untouched.

use crate::error::ProgramError;
use crate::MAX_BRIGHTNESS;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fade length in deciseconds the bridge applies when none is given
pub const DEFAULT_TRANSITION_TIME: u16 = 4;

/// Brightness target: an absolute level or a relative step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brightness {
    /// Absolute level, 0..=254
    Level(u8),
    /// Relative change, -254..=254 (`"+20"`, `"-40"`)
    Increment(i16),
}

impl Brightness {
    /// Build an absolute level, rejecting values outside 0..=254
    pub fn level(value: i64) -> Result<Self, ProgramError> {
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= MAX_BRIGHTNESS)
            .map(Brightness::Level)
            .ok_or_else(|| ProgramError::InvalidBrightness(value.to_string()))
    }
}

impl FromStr for Brightness {
    type Err = ProgramError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ProgramError::InvalidBrightness(s.to_string());

        if trimmed.starts_with('+') || trimmed.starts_with('-') {
            let step: i16 = trimmed.parse().map_err(|_| invalid())?;
            if step.unsigned_abs() > u16::from(MAX_BRIGHTNESS) {
                return Err(invalid());
            }
            return Ok(Brightness::Increment(step));
        }

        let level: i64 = trimmed.parse().map_err(|_| invalid())?;
        Brightness::level(level).map_err(|_| invalid())
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Brightness::Level(level) => write!(f, "{}", level),
            Brightness::Increment(step) => write!(f, "{:+}", step),
        }
    }
}

impl Serialize for Brightness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Brightness::Level(level) => serializer.serialize_u8(*level),
            Brightness::Increment(_) => serializer.collect_str(self),
        }
    }
}

impl<'de> Deserialize<'de> for Brightness {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum NumberOrString {
            Number(i64),
            String(String),
        }

        match NumberOrString::deserialize(deserializer)? {
            NumberOrString::Number(n) => Brightness::level(n).map_err(de::Error::custom),
            NumberOrString::String(s) => s.parse().map_err(de::Error::custom),
        }
    }
}

/// Target state for a device
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceState {
    /// Power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on: Option<bool>,

    /// Brightness level or increment
    #[serde(default, alias = "brightness", skip_serializing_if = "Option::is_none")]
    pub bri: Option<Brightness>,

    /// Hue, 0..=65535
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hue: Option<u16>,

    /// Saturation, 0..=254
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<u8>,

    /// CIE color coordinate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xy: Option<[f64; 2]>,

    /// Color temperature in mireds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ct: Option<u16>,

    /// Color temperature in Kelvin
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctk: Option<u32>,

    /// Device-side fade length in deciseconds
    #[serde(
        default,
        rename = "transitiontime",
        skip_serializing_if = "Option::is_none"
    )]
    pub transition_time: Option<u16>,

    /// Fade length in seconds; overrides `transitiontime`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl DeviceState {
    /// Empty state (changes nothing)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set power
    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    /// Set brightness
    pub fn with_brightness(mut self, bri: Brightness) -> Self {
        self.bri = Some(bri);
        self
    }

    /// Set fade length in seconds
    pub fn with_time(mut self, seconds: f64) -> Self {
        self.time = Some(seconds);
        self
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.on.is_none()
            && self.bri.is_none()
            && self.hue.is_none()
            && self.sat.is_none()
            && self.xy.is_none()
            && self.ct.is_none()
            && self.ctk.is_none()
            && self.transition_time.is_none()
            && self.time.is_none()
    }

    /// Color temperature in mireds; `ct` wins over `ctk`
    pub fn mireds(&self) -> Option<u16> {
        self.ct.or_else(|| {
            self.ctk
                .filter(|k| *k > 0)
                .map(|k| (1_000_000 / k).min(u32::from(u16::MAX)) as u16)
        })
    }

    /// Fade length in deciseconds as sent to the bridge
    pub fn transition_deciseconds(&self) -> u16 {
        match self.time {
            Some(secs) if secs.is_finite() && secs >= 0.0 => {
                (secs * 10.0).round().min(f64::from(u16::MAX)) as u16
            }
            _ => self.transition_time.unwrap_or(DEFAULT_TRANSITION_TIME),
        }
    }

    /// How long the device takes to reach this state
    pub fn transition_duration(&self) -> Duration {
        Duration::from_millis(u64::from(self.transition_deciseconds()) * 100)
    }

    /// Check value ranges that serde cannot express
    pub(crate) fn check(&self) -> Result<(), String> {
        if let Some(secs) = self.time {
            if !secs.is_finite() || secs < 0.0 {
                return Err(format!("'time' must be a non-negative number, got {}", secs));
            }
        }
        if let Some([x, y]) = self.xy {
            if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
                return Err(format!("'xy' components must be within 0..1, got [{}, {}]", x, y));
            }
        }
        if self.ctk == Some(0) {
            return Err("'ctk' must be greater than zero".to_string());
        }
        Ok(())
    }
}
