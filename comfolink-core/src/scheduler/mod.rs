//! Cooperative task scheduling
//!
//! Many independent, logically sequential exchanges share one execution
//! thread. Each task is a suspendable procedure: nested calls compose
//! synchronously and resolve within a single tick, and a task only truly
//! suspends while waiting for the transport (see [`yield_now`]). The host
//! drives progress by calling [`TaskQueue::poll`] from its main loop.

mod queue;
mod yield_now;

pub use queue::TaskQueue;
pub use yield_now::{yield_now, YieldNow};
