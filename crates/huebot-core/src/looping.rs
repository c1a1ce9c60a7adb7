//! Loop policies for composite steps

use crate::error::ProgramError;
use crate::timing::TimeOption;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{de, Deserialize, Deserializer};
use std::time::Duration;

/// Elapsed-time budget for a timer loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timer {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl Timer {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(
            self.hours
                .saturating_mul(3600)
                .saturating_add(self.minutes.saturating_mul(60))
                .saturating_add(self.seconds),
        )
    }
}

/// Absolute local date and time at which a deadline loop stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl Deadline {
    pub fn at(&self) -> NaiveDateTime {
        NaiveDateTime::new(self.date, self.time)
    }
}

impl<'de> Deserialize<'de> for Deadline {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Raw {
            date: String,
            time: String,
        }

        let raw = Raw::deserialize(deserializer)?;
        let date = NaiveDate::parse_from_str(raw.date.trim(), "%Y-%m-%d").map_err(|_| {
            de::Error::custom(ProgramError::InvalidDeadline {
                field: "date",
                value: raw.date.clone(),
            })
        })?;
        let time = NaiveTime::parse_from_str(raw.time.trim(), "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(raw.time.trim(), "%H:%M"))
            .map_err(|_| {
                de::Error::custom(ProgramError::InvalidDeadline {
                    field: "time",
                    value: raw.time.clone(),
                })
            })?;

        Ok(Deadline { date, time })
    }
}

/// How many times a loop body runs
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopMode {
    /// Until cancelled
    Infinite,
    /// Exactly n times
    Counted(u64),
    /// A count drawn once from `min..=max` at loop entry
    Random { min: u64, max: u64 },
    /// Until the elapsed time since loop entry reaches the budget
    Timer(Timer),
    /// Until the wall clock reaches the deadline
    Deadline(Deadline),
}

impl LoopMode {
    /// Short name used in logs and run events
    pub fn name(&self) -> &'static str {
        match self {
            LoopMode::Infinite => "infinite",
            LoopMode::Counted(_) => "counted",
            LoopMode::Random { .. } => "random",
            LoopMode::Timer(_) => "timer",
            LoopMode::Deadline(_) => "deadline",
        }
    }
}

/// Repetition of a composite step's body
///
/// Without any mode the body runs once.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "LoopSpec")]
pub struct Loop {
    pub mode: LoopMode,
    /// Extra delay after every iteration
    pub pause: Option<TimeOption>,
}

impl Loop {
    pub fn new(mode: LoopMode) -> Self {
        Self { mode, pause: None }
    }

    pub fn once() -> Self {
        Self::new(LoopMode::Counted(1))
    }

    pub fn with_pause(mut self, pause: TimeOption) -> Self {
        self.pause = Some(pause);
        self
    }

    pub(crate) fn check(&self, path: &str) -> Result<(), ProgramError> {
        if let LoopMode::Random { min, max } = self.mode {
            if min > max {
                return Err(ProgramError::InvertedRange {
                    path: format!("{}.loop.random", path),
                    min: min as f64,
                    max: max as f64,
                });
            }
        }
        if let Some(pause) = &self.pause {
            pause.check(&format!("{}.loop.pause", path))?;
        }
        Ok(())
    }
}

impl Default for Loop {
    fn default() -> Self {
        Self::once()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RandomRange {
    min: u64,
    max: u64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LoopFields {
    #[serde(default)]
    infinite: bool,
    #[serde(default, alias = "counted")]
    count: Option<u64>,
    #[serde(default)]
    random: Option<RandomRange>,
    #[serde(default)]
    timer: Option<Timer>,
    #[serde(default)]
    deadline: Option<Deadline>,
    #[serde(default)]
    pause: Option<TimeOption>,
}

/// Wire shape of a loop: `true`, `false`, or an object with one mode
#[derive(Deserialize)]
#[serde(untagged)]
enum LoopSpec {
    Flag(bool),
    Fields(LoopFields),
}

impl TryFrom<LoopSpec> for Loop {
    type Error = ProgramError;

    fn try_from(spec: LoopSpec) -> Result<Self, Self::Error> {
        let fields = match spec {
            LoopSpec::Flag(true) => return Ok(Loop::new(LoopMode::Infinite)),
            LoopSpec::Flag(false) => return Ok(Loop::once()),
            LoopSpec::Fields(fields) => fields,
        };

        let mut modes = Vec::new();
        if fields.infinite {
            modes.push(LoopMode::Infinite);
        }
        if let Some(n) = fields.count {
            modes.push(LoopMode::Counted(n));
        }
        if let Some(RandomRange { min, max }) = fields.random {
            modes.push(LoopMode::Random { min, max });
        }
        if let Some(timer) = fields.timer {
            modes.push(LoopMode::Timer(timer));
        }
        if let Some(deadline) = fields.deadline {
            modes.push(LoopMode::Deadline(deadline));
        }

        if modes.len() > 1 {
            let names: Vec<_> = modes.iter().map(LoopMode::name).collect();
            return Err(ProgramError::ConflictingLoopModes {
                modes: names.join(", "),
            });
        }

        Ok(Loop {
            mode: modes.pop().unwrap_or(LoopMode::Counted(1)),
            pause: fields.pause,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_duration() {
        let timer = Timer {
            hours: 1,
            minutes: 30,
            seconds: 5,
        };
        assert_eq!(timer.duration(), Duration::from_secs(5405));
    }

    #[test]
    fn test_timer_duration_saturates() {
        let timer = Timer {
            hours: u64::MAX,
            minutes: u64::MAX,
            seconds: 1,
        };
        assert_eq!(timer.duration(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_default_loop_runs_once() {
        assert_eq!(Loop::default().mode, LoopMode::Counted(1));
    }

    #[test]
    fn test_conflicting_modes() {
        let spec = LoopSpec::Fields(LoopFields {
            infinite: true,
            count: Some(3),
            random: None,
            timer: None,
            deadline: None,
            pause: None,
        });
        let err = Loop::try_from(spec).unwrap_err();
        assert_eq!(
            err,
            ProgramError::ConflictingLoopModes {
                modes: "infinite, counted".to_string()
            }
        );
    }

    #[test]
    fn test_inverted_random_range() {
        let repeat = Loop::new(LoopMode::Random { min: 5, max: 2 });
        assert!(matches!(
            repeat.check("parallel"),
            Err(ProgramError::InvertedRange { .. })
        ));
    }
}
