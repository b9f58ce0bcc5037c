//! Transport-agnostic driver core for ComfoAir ventilation units
//!
//! This crate contains all driver logic that does not depend on a specific
//! transport or embedding:
//!
//! - A cooperative, strictly single-threaded task scheduler
//! - The framed exchange engine (commands, responses, acknowledgements)
//! - Transport and observer traits implemented by the embedding firmware
//! - The controller tying periodic reads and setpoint writes together
//!
//! The scheduling model: exactly one exchange owns the serial line at a
//! time. A task runs synchronously through any number of nested calls
//! until it must wait for incoming bytes, then suspends; the host resumes
//! it by calling [`ComfoAir::poll`] (or [`TaskQueue::poll`] directly) from
//! its main loop. Tasks complete in enqueue order and never interleave.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

pub mod controller;
pub mod engine;
pub mod scheduler;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use controller::ComfoAir;
pub use engine::{Engine, ExchangeError};
pub use scheduler::{yield_now, TaskQueue};
pub use traits::{
    BinarySink, BypassSink, FanLevelSink, FaultSink, SerialPort, SetpointSink, TemperatureSink,
};
