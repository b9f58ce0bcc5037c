//! Command catalog for the ComfoAir controller protocol
//!
//! Each request is answered with the request code + 1. Read commands carry
//! no payload and return a fixed-size data block; write commands carry a
//! one-byte payload and are only acknowledged.

// Write commands
/// Set the ventilation fan level (payload: level + 1)
pub const CMD_SET_LEVEL: u16 = 0x0099;
/// Set the comfort temperature setpoint (payload: raw temperature byte)
pub const CMD_SET_COMFORT_TEMPERATURE: u16 = 0x00D3;

// Read commands
/// Read the bypass status block
pub const CMD_GET_BYPASS_STATUS: u16 = 0x000D;
/// Read the ventilation level block
pub const CMD_GET_VENTILATION_LEVELS: u16 = 0x00CD;
/// Read the temperature block
pub const CMD_GET_TEMPERATURES: u16 = 0x00D1;
/// Read the fault block
pub const CMD_GET_FAULTS: u16 = 0x00D9;
/// Read the bypass control block (diagnostic only)
pub const CMD_GET_BYPASS_CONTROL: u16 = 0x00DF;

/// Response payload size of [`CMD_GET_BYPASS_STATUS`]
pub const BYPASS_STATUS_LEN: usize = 4;
/// Response payload size of [`CMD_GET_VENTILATION_LEVELS`]
pub const VENTILATION_LEVELS_LEN: usize = 14;
/// Response payload size of [`CMD_GET_TEMPERATURES`]
pub const TEMPERATURES_LEN: usize = 9;
/// Response payload size of [`CMD_GET_FAULTS`]
pub const FAULTS_LEN: usize = 17;
/// Response payload size of [`CMD_GET_BYPASS_CONTROL`]
pub const BYPASS_CONTROL_LEN: usize = 7;
