//! Core types for huebot
//!
//! This crate provides the program model shared by the interpreter and the
//! device gateways: the target [`DeviceState`], abstract [`DeviceRef`]s,
//! [`Pause`] timing, [`Loop`] repetition policies and the recursive [`Step`]
//! tree.
//!
//! Everything here is plain data. Programs arrive already deserialized
//! (YAML or JSON through serde) and are never mutated while they run.

mod device_ref;
mod device_state;
mod error;
mod looping;
mod step;
mod timing;

pub use device_ref::DeviceRef;
pub use device_state::{Brightness, DeviceState, DEFAULT_TRANSITION_TIME};
pub use error::{ProgramError, ProgramResult};
pub use looping::{Deadline, Loop, LoopMode, Timer};
pub use step::{Composite, Program, Step, Transition};
pub use timing::{Jitter, Pause, TimeOption};

/// Upper bound of the absolute brightness scale used by Hue bridges
pub const MAX_BRIGHTNESS: u8 = 254;
