//! Pause timing
//!
//! A [`TimeOption`] is a base delay in seconds with an optional random
//! jitter range. A [`Pause`] brackets a step with one before and one after.

use crate::error::ProgramError;
use serde::{Deserialize, Deserializer};

/// Random offset range in seconds, added to a base delay
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Jitter {
    pub min: f64,
    pub max: f64,
}

/// A delay: `seconds + uniform(jitter.min, jitter.max)`, never negative
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimeOption {
    pub seconds: f64,
    pub jitter: Option<Jitter>,
}

impl TimeOption {
    /// Fixed delay
    pub fn seconds(seconds: f64) -> Self {
        Self {
            seconds,
            jitter: None,
        }
    }

    /// Add a jitter range
    pub fn with_jitter(mut self, min: f64, max: f64) -> Self {
        self.jitter = Some(Jitter { min, max });
        self
    }

    pub(crate) fn check(&self, path: &str) -> Result<(), ProgramError> {
        if !self.seconds.is_finite() || self.seconds < 0.0 {
            return Err(ProgramError::InvalidTime {
                path: path.to_string(),
                reason: format!("seconds must be a non-negative number, got {}", self.seconds),
            });
        }
        if let Some(jitter) = self.jitter {
            if !jitter.min.is_finite() || !jitter.max.is_finite() {
                return Err(ProgramError::InvalidTime {
                    path: path.to_string(),
                    reason: "jitter bounds must be finite".to_string(),
                });
            }
            if jitter.min > jitter.max {
                return Err(ProgramError::InvertedRange {
                    path: path.to_string(),
                    min: jitter.min,
                    max: jitter.max,
                });
            }
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for TimeOption {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Full {
            #[serde(default)]
            seconds: f64,
            #[serde(default, alias = "random")]
            jitter: Option<Jitter>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum SecondsOrFull {
            Seconds(f64),
            Full(Full),
        }

        Ok(match SecondsOrFull::deserialize(deserializer)? {
            SecondsOrFull::Seconds(seconds) => TimeOption::seconds(seconds),
            SecondsOrFull::Full(full) => TimeOption {
                seconds: full.seconds,
                jitter: full.jitter,
            },
        })
    }
}

/// Delays around a step's core behavior
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pause {
    pub before: Option<TimeOption>,
    pub after: Option<TimeOption>,
}

impl Pause {
    /// Pause only after the step
    pub fn after(option: TimeOption) -> Self {
        Self {
            before: None,
            after: Some(option),
        }
    }

    /// Pause only before the step
    pub fn before(option: TimeOption) -> Self {
        Self {
            before: Some(option),
            after: None,
        }
    }

    pub(crate) fn check(&self, path: &str) -> Result<(), ProgramError> {
        if let Some(before) = &self.before {
            before.check(&format!("{}.pause.before", path))?;
        }
        if let Some(after) = &self.after {
            after.check(&format!("{}.pause.after", path))?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for Pause {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Both {
            #[serde(default)]
            before: Option<TimeOption>,
            #[serde(default)]
            after: Option<TimeOption>,
        }

        // A bare number means "after"
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum AfterOrBoth {
            After(f64),
            Both(Both),
        }

        Ok(match AfterOrBoth::deserialize(deserializer)? {
            AfterOrBoth::After(seconds) => Pause::after(TimeOption::seconds(seconds)),
            AfterOrBoth::Both(both) => Pause {
                before: both.before,
                after: both.after,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_negative_seconds() {
        let err = TimeOption::seconds(-1.0).check("serial").unwrap_err();
        assert!(matches!(err, ProgramError::InvalidTime { .. }));
    }

    #[test]
    fn test_check_inverted_jitter() {
        let err = TimeOption::seconds(1.0)
            .with_jitter(2.0, 1.0)
            .check("serial")
            .unwrap_err();
        assert!(matches!(err, ProgramError::InvertedRange { .. }));
    }

    #[test]
    fn test_negative_jitter_is_allowed() {
        assert!(TimeOption::seconds(1.0)
            .with_jitter(-0.5, 0.5)
            .check("serial")
            .is_ok());
    }

    #[test]
    fn test_pause_check_reports_path() {
        let pause = Pause::before(TimeOption::seconds(f64::NAN));
        match pause.check("serial.steps[0]") {
            Err(ProgramError::InvalidTime { path, .. }) => {
                assert_eq!(path, "serial.steps[0].pause.before")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
