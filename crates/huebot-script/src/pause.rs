//! Pause primitive: jittered delay resolution and cancellable sleep

use crate::random::RandomSource;
use huebot_core::TimeOption;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a sleep ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slept {
    Elapsed,
    Cancelled,
}

/// Effective delay of a time option
///
/// `seconds + uniform(jitter.min, jitter.max)`, clamped at zero.
pub fn resolve(option: &TimeOption, rng: &dyn RandomSource) -> Duration {
    let jitter = option
        .jitter
        .map(|j| rng.uniform_f64(j.min, j.max))
        .unwrap_or(0.0);
    let secs = (option.seconds + jitter).max(0.0);
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Sleep unless cancelled first
///
/// A zero duration still observes an already-cancelled token.
pub async fn sleep(duration: Duration, cancel: &CancellationToken) -> Slept {
    if cancel.is_cancelled() {
        return Slept::Cancelled;
    }
    if duration.is_zero() {
        return Slept::Elapsed;
    }
    tokio::select! {
        _ = cancel.cancelled() => Slept::Cancelled,
        _ = tokio::time::sleep(duration) => Slept::Elapsed,
    }
}
