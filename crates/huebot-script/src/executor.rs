//! Interpreter
//!
//! Walks a step tree: transitions dispatch to the device gateway, serial steps
//! run children in order, parallel steps fork one path per child and join them
//! before the iteration ends. Every composite step repeats under its loop
//! evaluator, and pauses are cancellable sleeps.
//!
//! Device errors are recorded and never unwind. Cancellation and fatal errors
//! unwind to [`Interpreter::run`]; a fatal error also cancels an internal child
//! token so sibling branches stop at their next check.

use crate::evaluator::LoopEvaluator;
use crate::events::{NullObserver, RunEvent, RunObserver};
use crate::gateway::{Device, DeviceGateway, Dispatch};
use crate::pause::{self, Slept};
use crate::random::{RandomSource, ThreadRandom};
use crate::resolver::DeviceResolver;
use crate::result::{DeviceError, DeviceFailure, RunError, RunResult, RunStatus};
use futures::future::join_all;
use huebot_config::{InterpreterConfig, PauseScope};
use huebot_core::{Composite, DeviceRef, DeviceState, Program, Step, TimeOption, Transition};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};
use ulid::Ulid;

/// Why a step stopped early
#[derive(Debug)]
enum Interrupt {
    Cancelled,
    Fatal(RunError),
}

type Flow = Result<(), Interrupt>;

/// Combine joined branch outcomes; a fatal error wins over cancellation
fn merge(results: Vec<Flow>) -> Flow {
    let mut cancelled = false;
    for result in results {
        match result {
            Ok(()) => {}
            Err(Interrupt::Fatal(e)) => return Err(Interrupt::Fatal(e)),
            Err(Interrupt::Cancelled) => cancelled = true,
        }
    }
    if cancelled {
        Err(Interrupt::Cancelled)
    } else {
        Ok(())
    }
}

/// Per-run state shared by every branch
struct RunContext {
    halt: CancellationToken,
    failures: Mutex<Vec<DeviceFailure>>,
}

impl RunContext {
    fn record(&self, device: String, step: &str, error: DeviceError) {
        warn!(device = %device, step, error = %error, "Device failure");
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DeviceFailure {
                device,
                step: step.to_string(),
                error,
            });
    }

    fn fatal(&self, error: RunError) -> Interrupt {
        warn!(error = %error, "Halting run");
        self.halt.cancel();
        Interrupt::Fatal(error)
    }
}

/// Runs programs against a device gateway
pub struct Interpreter {
    gateway: Arc<dyn DeviceGateway>,
    resolver: Arc<dyn DeviceResolver>,
    observer: Arc<dyn RunObserver>,
    rng: Arc<dyn RandomSource>,
    config: InterpreterConfig,
}

impl Interpreter {
    /// Create an interpreter with default configuration
    pub fn new(gateway: Arc<dyn DeviceGateway>, resolver: Arc<dyn DeviceResolver>) -> Self {
        Self {
            gateway,
            resolver,
            observer: Arc::new(NullObserver),
            rng: Arc::new(ThreadRandom),
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_random(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Run a program until it finishes, is cancelled, or hits a fatal error
    #[instrument(skip_all, fields(program = %program.display_name()))]
    pub async fn run(&self, program: &Program, cancel: CancellationToken) -> RunResult {
        let run_id = Ulid::new();
        info!(%run_id, "Starting program");
        self.emit(RunEvent::Started {
            run_id: run_id.to_string(),
            program: program.display_name().to_string(),
        });

        let ctx = RunContext {
            halt: cancel.child_token(),
            failures: Mutex::new(Vec::new()),
        };

        let errors = program.step.validate();
        let outcome = if errors.is_empty() {
            self.execute(&program.step, program.step.kind().to_string(), &ctx)
                .await
        } else {
            Err(Interrupt::Fatal(RunError::InvalidProgram(errors)))
        };

        let (status, fatal) = match outcome {
            Ok(()) => (RunStatus::Completed, None),
            Err(Interrupt::Cancelled) => (RunStatus::Cancelled, None),
            Err(Interrupt::Fatal(e)) => (RunStatus::Fatal, Some(e)),
        };

        let failures = ctx
            .failures
            .into_inner()
            .unwrap_or_else(|e| e.into_inner());

        match &fatal {
            Some(e) => warn!(%run_id, error = %e, "Program stopped"),
            None => info!(%run_id, ?status, failures = failures.len(), "Program stopped"),
        }
        self.emit(RunEvent::Stopped {
            run_id: run_id.to_string(),
            status,
        });

        RunResult {
            run_id,
            status,
            failures,
            fatal,
        }
    }

    /// Execute one step and everything below it
    fn execute<'a>(
        &'a self,
        step: &'a Step,
        path: String,
        ctx: &'a RunContext,
    ) -> Pin<Box<dyn Future<Output = Flow> + Send + 'a>> {
        Box::pin(async move {
            trace!(path = %path, "Executing {}", step.kind());
            match step {
                Step::Transition(t) => self.execute_transition(t, &path, ctx).await,
                Step::Serial(c) => self.execute_composite(c, false, &path, ctx).await,
                Step::Parallel(c) => self.execute_composite(c, true, &path, ctx).await,
            }
        })
    }

    async fn execute_transition(&self, t: &Transition, path: &str, ctx: &RunContext) -> Flow {
        self.pause(t.pause.before.as_ref(), path, ctx).await?;

        if ctx.halt.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }

        let default_refs = [DeviceRef::AllInputs];
        let refs = t.devices.as_deref().unwrap_or(&default_refs);

        // One queue per distinct device, in first-seen order
        let mut queues: Vec<(Device, usize)> = Vec::new();
        for reference in refs {
            match self.resolver.resolve(reference) {
                Ok(devices) => {
                    for device in devices {
                        match queues.iter_mut().find(|(d, _)| *d == device) {
                            Some((_, n)) => *n += 1,
                            None => queues.push((device, 1)),
                        }
                    }
                }
                Err(e) => ctx.record(reference.to_string(), path, e.into()),
            }
        }

        self.emit(RunEvent::Transition {
            path: path.to_string(),
            devices: queues.iter().map(|(d, _)| d.to_string()).collect(),
        });

        let results = join_all(
            queues
                .iter()
                .map(|(device, times)| self.apply_queue(device, *times, t, path, ctx)),
        )
        .await;
        merge(results)?;

        self.pause(t.pause.after.as_ref(), path, ctx).await
    }

    /// Apply a state to one device `times` times, one apply in flight at once
    async fn apply_queue(
        &self,
        device: &Device,
        times: usize,
        t: &Transition,
        path: &str,
        ctx: &RunContext,
    ) -> Flow {
        for _ in 0..times {
            if ctx.halt.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }
            self.apply(device, &t.state, t.wait, path, ctx).await?;
        }
        Ok(())
    }

    async fn apply(
        &self,
        device: &Device,
        state: &DeviceState,
        wait: bool,
        path: &str,
        ctx: &RunContext,
    ) -> Flow {
        debug!(device = %device, path, wait, "Applying state");

        let outcome = match self.gateway.apply(device, state).await {
            Ok(Dispatch::Done) => Ok(()),
            // Fire and forget: the ack is dropped unread
            Ok(Dispatch::Pending(_)) if !wait => Ok(()),
            Ok(Dispatch::Pending(ack)) => {
                // The ack window opens once the fade is over
                let timeout = self.config.ack_timeout;
                let window = state.transition_duration() + timeout;
                match tokio::time::timeout(window, ack).await {
                    Ok(Ok(Ok(()))) => Ok(()),
                    Ok(Ok(Err(e))) => Err(DeviceError::Apply(e)),
                    Ok(Err(_)) => Err(DeviceError::AckDropped),
                    Err(_) => Err(DeviceError::AckTimeout(timeout)),
                }
            }
            Err(e) => Err(DeviceError::Apply(e)),
        };

        self.emit(RunEvent::Applied {
            path: path.to_string(),
            device: device.to_string(),
            error: outcome.as_ref().err().map(ToString::to_string),
        });

        match outcome {
            Ok(()) => Ok(()),
            Err(DeviceError::Apply(e)) if e.is_fatal() => Err(ctx.fatal(RunError::Gateway {
                device: device.to_string(),
                source: e,
            })),
            Err(e) => {
                ctx.record(device.to_string(), path, e);
                Ok(())
            }
        }
    }

    async fn execute_composite(
        &self,
        c: &Composite,
        parallel: bool,
        path: &str,
        ctx: &RunContext,
    ) -> Flow {
        let evaluator = LoopEvaluator::start(&c.r#loop, self.rng.as_ref()).map_err(|e| {
            ctx.fatal(RunError::Loop {
                path: path.to_string(),
                source: e,
            })
        })?;
        if let Some(n) = evaluator.resolved_count() {
            debug!(path, mode = evaluator.mode(), iterations = n, "Loop resolved");
        }

        let per_iteration = self.config.pause_scope == PauseScope::PerIteration;
        if !per_iteration {
            self.pause(c.pause.before.as_ref(), path, ctx).await?;
        }

        let mut completed = 0u64;
        while evaluator.should_continue(completed) {
            if ctx.halt.is_cancelled() {
                return Err(Interrupt::Cancelled);
            }

            let iteration = completed + 1;
            let mode = evaluator.mode();
            self.emit(if parallel {
                RunEvent::Parallel {
                    path: path.to_string(),
                    iteration,
                    mode,
                }
            } else {
                RunEvent::Serial {
                    path: path.to_string(),
                    iteration,
                    mode,
                }
            });

            if per_iteration {
                self.pause(c.pause.before.as_ref(), path, ctx).await?;
            }

            let children = c
                .steps
                .iter()
                .enumerate()
                .map(|(i, child)| (child, format!("{}.steps[{}].{}", path, i, child.kind())));
            if parallel {
                let results =
                    join_all(children.map(|(child, child_path)| self.execute(child, child_path, ctx)))
                        .await;
                merge(results)?;
            } else {
                for (child, child_path) in children {
                    self.execute(child, child_path, ctx).await?;
                }
            }

            if per_iteration {
                self.pause(c.pause.after.as_ref(), path, ctx).await?;
            }
            self.pause(c.r#loop.pause.as_ref(), path, ctx).await?;

            completed += 1;
            // Zero-length bodies must not starve the cancelling task
            tokio::task::yield_now().await;
        }

        if !per_iteration {
            self.pause(c.pause.after.as_ref(), path, ctx).await?;
        }
        Ok(())
    }

    async fn pause(&self, option: Option<&TimeOption>, path: &str, ctx: &RunContext) -> Flow {
        let Some(option) = option else {
            return Ok(());
        };

        let duration = pause::resolve(option, self.rng.as_ref());
        self.emit(RunEvent::Paused {
            path: path.to_string(),
            seconds: duration.as_secs_f64(),
        });

        match pause::sleep(duration, &ctx.halt).await {
            Slept::Elapsed => Ok(()),
            Slept::Cancelled => Err(Interrupt::Cancelled),
        }
    }

    fn emit(&self, event: RunEvent) {
        trace!(event = event.name(), ?event, "Run event");
        self.observer.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;

    #[test]
    fn test_merge_prefers_fatal() {
        let results = vec![
            Err(Interrupt::Cancelled),
            Ok(()),
            Err(Interrupt::Fatal(RunError::Gateway {
                device: "light:Desk".into(),
                source: GatewayError::Unreachable("connection refused".into()),
            })),
        ];
        assert!(matches!(merge(results), Err(Interrupt::Fatal(_))));
    }

    #[test]
    fn test_merge_cancelled() {
        assert!(matches!(
            merge(vec![Ok(()), Err(Interrupt::Cancelled)]),
            Err(Interrupt::Cancelled)
        ));
        assert!(merge(vec![Ok(()), Ok(())]).is_ok());
    }
}
