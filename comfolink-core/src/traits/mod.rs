//! Abstraction traits implemented by the embedding firmware
//!
//! [`SerialPort`] is the byte transport underneath the protocol engine.
//! The sink traits are the observer side: every sink is a nullable
//! dependency, and the driver publishes only values the unit actually
//! reported.

pub mod port;
pub mod sinks;

pub use port::SerialPort;
pub use sinks::{BinarySink, BypassSink, FanLevelSink, FaultSink, SetpointSink, TemperatureSink};
