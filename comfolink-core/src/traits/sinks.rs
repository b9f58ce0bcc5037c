//! Observer sinks for decoded readings.
//!
//! The controller publishes to whichever sinks the embedding wired in and
//! skips the rest; the exchange engine itself never knows which sinks
//! exist. A channel the unit flagged invalid is published as `None`
//! rather than a stale or zero value.

use comfolink_protocol::values::FaultReport;

/// Sink for one temperature channel, tenths of a degree Celsius.
pub trait TemperatureSink {
    /// Publish a reading, or `None` when the channel carries no valid
    /// value.
    fn publish(&mut self, celsius_x10: Option<i16>);
}

/// Sink for the bypass opening percentage.
///
/// An unknown bypass position is never published.
pub trait BypassSink {
    fn publish(&mut self, percent: u8);
}

/// Sink for a boolean diagnostic such as the filter-full flag.
pub trait BinarySink {
    fn publish(&mut self, value: bool);
}

/// Sink for the active ventilation level.
///
/// An unset level is never published.
pub trait FanLevelSink {
    fn publish(&mut self, level: u8);
}

/// Sink for the comfort temperature setpoint readback.
pub trait SetpointSink {
    fn publish(&mut self, celsius_x10: i16);

    /// Last published value, if any.
    ///
    /// Lets the controller skip republishing an unchanged setpoint.
    fn current(&self) -> Option<i16>;
}

/// Sink for the decoded fault block.
pub trait FaultSink {
    fn publish(&mut self, report: &FaultReport);
}
