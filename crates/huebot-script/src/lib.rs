//! Step tree interpreter for huebot
//!
//! This crate runs [`huebot_core::Program`]s against a [`DeviceGateway`]:
//!
//! - Loop evaluation (`Infinite`, `Counted`, `Random`, `Timer`, `Deadline`)
//! - Jittered, cancellable pauses
//! - Serial execution and parallel fork/join
//! - Device resolution through a [`DeviceResolver`]
//! - Per-device error aggregation into a [`RunResult`]
//!
//! # Example
//!
//! ```ignore
//! use huebot_script::{DeviceMapper, Interpreter};
//! use tokio_util::sync::CancellationToken;
//!
//! let interpreter = Interpreter::new(gateway, Arc::new(mapper));
//! let result = interpreter.run(&program, CancellationToken::new()).await;
//! std::process::exit(result.exit_code());
//! ```

mod evaluator;
mod events;
mod executor;
mod gateway;
pub mod pause;
mod random;
mod resolver;
mod result;

pub use evaluator::{LoopError, LoopEvaluator};
pub use events::{CollectingObserver, NullObserver, RunEvent, RunObserver};
pub use executor::Interpreter;
pub use gateway::{Device, DeviceGateway, DeviceKind, Dispatch, GatewayError};
pub use pause::Slept;
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use resolver::{DeviceInput, DeviceMapper, DeviceResolver, ResolveError};
pub use result::{
    DeviceError, DeviceFailure, RunError, RunResult, RunStatus, EXIT_CANCELLED,
};

// Re-exports for callers wiring a run
pub use huebot_config::{InterpreterConfig, PauseScope};
pub use tokio_util::sync::CancellationToken;
