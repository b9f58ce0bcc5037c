//! ComfoAir serial control protocol
//!
//! This crate defines the framed request/response protocol spoken over the
//! point-to-point serial link between a controller and a ComfoAir
//! ventilation unit.
//!
//! # Protocol Overview
//!
//! Every message is framed between escape-prefixed markers:
//!
//! ```text
//! ┌─────────┬───────────────┬─────┬──────────────┬──────────┬─────────┐
//! │ ESC STA │ cmd_hi cmd_lo │ len │ data[0..len) │ checksum │ ESC END │
//! │ 2B      │ 2B            │ 1B  │ 0–32B raw    │ 1B       │ 2B      │
//! └─────────┴───────────────┴─────┴──────────────┴──────────┴─────────┘
//! ```
//!
//! Data bytes equal to the escape value are doubled on the wire; the
//! checksum covers the unescaped logical bytes (command, length, data) on
//! top of a fixed seed. A response answers with the request's command code
//! plus one, and every successfully received frame is acknowledged with
//! the two-byte `ESC ACK` sequence.

#![no_std]
#![deny(unsafe_code)]

pub mod commands;
pub mod frame;
pub mod values;

pub use frame::{
    response_command, Checksum, FrameError, Request, Response, ResponseDecoder, ACK,
    ACK_SEQUENCE, CHECKSUM_SEED, END, ESCAPE, MAX_DATA_LEN, MAX_WIRE_LEN, START,
};
pub use values::{BypassStatus, FaultReport, TemperatureReport, VentilationStatus};
