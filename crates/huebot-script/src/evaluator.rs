//! Loop evaluator
//!
//! Turns a [`Loop`] into a termination check that runs between iterations.
//! Random counts are drawn once at loop entry, and timer and deadline loops
//! get a fixed monotonic stop instant at loop entry. An iteration that is
//! already running is never cut short by the evaluator.

use crate::random::RandomSource;
use chrono::{DateTime, Local};
use huebot_core::{Loop, LoopMode};
use thiserror::Error;
use tokio::time::Instant;

/// Loop configuration that cannot run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoopError {
    #[error("random loop range is inverted (min {min} > max {max})")]
    InvertedRandomRange { min: u64, max: u64 },

    #[error("deadline {0} does not exist in the local time zone")]
    InvalidDeadline(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Policy {
    Unbounded,
    Count(u64),
    Until(Instant),
}

/// Termination state of one loop run
#[derive(Debug, Clone)]
pub struct LoopEvaluator {
    mode: &'static str,
    policy: Policy,
}

impl LoopEvaluator {
    /// Enter a loop now
    pub fn start(repeat: &Loop, rng: &dyn RandomSource) -> Result<Self, LoopError> {
        Self::start_at(repeat, rng, Instant::now(), Local::now())
    }

    /// Enter a loop at the given monotonic and wall-clock moment
    pub fn start_at(
        repeat: &Loop,
        rng: &dyn RandomSource,
        started: Instant,
        wall: DateTime<Local>,
    ) -> Result<Self, LoopError> {
        let policy = match repeat.mode {
            LoopMode::Infinite => Policy::Unbounded,
            LoopMode::Counted(n) => Policy::Count(n),
            LoopMode::Random { min, max } => {
                if min > max {
                    return Err(LoopError::InvertedRandomRange { min, max });
                }
                Policy::Count(rng.uniform_u64(min, max))
            }
            LoopMode::Timer(timer) => started
                .checked_add(timer.duration())
                .map(Policy::Until)
                .unwrap_or(Policy::Unbounded),
            LoopMode::Deadline(deadline) => {
                let at = deadline.at();
                let target = at
                    .and_local_timezone(Local)
                    .earliest()
                    .ok_or_else(|| LoopError::InvalidDeadline(at.to_string()))?;
                match (target - wall).to_std() {
                    // Already past: zero iterations
                    Err(_) => Policy::Until(started),
                    Ok(remaining) => started
                        .checked_add(remaining)
                        .map(Policy::Until)
                        .unwrap_or(Policy::Unbounded),
                }
            }
        };

        Ok(Self {
            mode: repeat.mode.name(),
            policy,
        })
    }

    /// Whether another iteration should start after `completed` iterations
    pub fn should_continue(&self, completed: u64) -> bool {
        match self.policy {
            Policy::Unbounded => true,
            Policy::Count(n) => completed < n,
            Policy::Until(stop) => Instant::now() < stop,
        }
    }

    /// Iteration count for counted and random loops
    pub fn resolved_count(&self) -> Option<u64> {
        match self.policy {
            Policy::Count(n) => Some(n),
            _ => None,
        }
    }

    /// Name of the loop mode this evaluator was built from
    pub fn mode(&self) -> &'static str {
        self.mode
    }
}
