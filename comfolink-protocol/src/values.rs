//! Typed views of the controller's response payloads
//!
//! Temperatures are handled as `i16` tenths of a degree Celsius, which
//! represents the protocol's half-degree resolution exactly. A channel the
//! unit flags invalid decodes to `None` and must never be read as zero.

use crate::commands::{
    BYPASS_STATUS_LEN, FAULTS_LEN, TEMPERATURES_LEN, VENTILATION_LEVELS_LEN,
};
use crate::frame::FrameError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Validity bit for the outside temperature channel
pub const OUTSIDE_TEMP_FLAG: u8 = 0x01;
/// Validity bit for the supply temperature channel
pub const SUPPLY_TEMP_FLAG: u8 = 0x02;
/// Validity bit for the extract temperature channel
pub const EXTRACT_TEMP_FLAG: u8 = 0x04;
/// Validity bit for the exhaust temperature channel
pub const EXHAUST_TEMP_FLAG: u8 = 0x08;

/// Bypass status byte reported while the position is unknown
pub const BYPASS_UNKNOWN: u8 = 0xFF;

/// Lowest fan level accepted by the unit
pub const MIN_LEVEL: u8 = 1;
/// Highest fan level accepted by the unit
pub const MAX_LEVEL: u8 = 3;

/// Lower end of the vendor UI setpoint range, tenths of a degree
pub const MIN_COMFORT_X10: i16 = 120;
/// Upper end of the vendor UI setpoint range, tenths of a degree
pub const MAX_COMFORT_X10: i16 = 280;

/// Convert a raw wire byte to tenths of a degree Celsius
///
/// The byte is signed: values >= 128 wrap negative. One raw step is half a
/// degree, offset by -20 degrees.
pub fn raw_to_celsius_x10(raw: u8) -> i16 {
    (raw as i8 as i16) * 5 - 200
}

/// Convert tenths of a degree Celsius to the raw wire byte
///
/// Rounds to the nearest representable half degree (exact halves cannot
/// occur in tenths). The value is not range checked before transmission;
/// setpoint limits are the caller's responsibility.
pub fn celsius_x10_to_raw(celsius_x10: i16) -> u8 {
    let scaled = celsius_x10 as i32 + 200;
    let raw = if scaled >= 0 {
        (scaled + 2) / 5
    } else {
        (scaled - 2) / 5
    };
    raw as u8
}

/// Encode a fan level for transmission
///
/// Levels are stored off by one on the wire; zero is reserved for "unset".
pub const fn level_to_raw(level: u8) -> u8 {
    level.wrapping_add(1)
}

/// Decoded temperature block (response to
/// [`CMD_GET_TEMPERATURES`](crate::commands::CMD_GET_TEMPERATURES))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemperatureReport {
    /// Comfort setpoint, tenths of a degree
    pub comfort_x10: i16,
    /// Outside air temperature, if the unit reports it valid
    pub outside_x10: Option<i16>,
    /// Supply air temperature, if the unit reports it valid
    pub supply_x10: Option<i16>,
    /// Extract air temperature, if the unit reports it valid
    pub extract_x10: Option<i16>,
    /// Exhaust air temperature, if the unit reports it valid
    pub exhaust_x10: Option<i16>,
}

impl TemperatureReport {
    /// Parse the 9-byte temperature payload
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != TEMPERATURES_LEN {
            return Err(FrameError::InvalidFrame);
        }

        let flags = payload[5];
        let channel = |flag: u8, raw: u8| {
            if flags & flag != 0 {
                Some(raw_to_celsius_x10(raw))
            } else {
                None
            }
        };

        Ok(Self {
            comfort_x10: raw_to_celsius_x10(payload[0]),
            outside_x10: channel(OUTSIDE_TEMP_FLAG, payload[1]),
            supply_x10: channel(SUPPLY_TEMP_FLAG, payload[2]),
            extract_x10: channel(EXTRACT_TEMP_FLAG, payload[3]),
            exhaust_x10: channel(EXHAUST_TEMP_FLAG, payload[4]),
        })
    }
}

/// Decoded bypass status (response to
/// [`CMD_GET_BYPASS_STATUS`](crate::commands::CMD_GET_BYPASS_STATUS))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BypassStatus {
    /// Bypass opening in percent; `None` while the unit reports unknown
    pub percent: Option<u8>,
}

impl BypassStatus {
    /// Parse the 4-byte bypass status payload
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != BYPASS_STATUS_LEN {
            return Err(FrameError::InvalidFrame);
        }

        let raw = payload[0];
        Ok(Self {
            percent: (raw != BYPASS_UNKNOWN).then_some(raw),
        })
    }
}

/// Decoded ventilation level block (response to
/// [`CMD_GET_VENTILATION_LEVELS`](crate::commands::CMD_GET_VENTILATION_LEVELS))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VentilationStatus {
    /// Active fan level; `None` while the unit has not settled on one
    pub current_level: Option<u8>,
}

impl VentilationStatus {
    /// Parse the 14-byte ventilation level payload
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != VENTILATION_LEVELS_LEN {
            return Err(FrameError::InvalidFrame);
        }

        // Stored off by one; zero means unset
        Ok(Self {
            current_level: payload[8].checked_sub(1),
        })
    }
}

/// Decoded fault block (response to
/// [`CMD_GET_FAULTS`](crate::commands::CMD_GET_FAULTS))
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FaultReport {
    /// Current A fault code
    pub fault_a: u8,
    /// Current E fault code
    pub fault_e: u8,
    /// Filter needs replacement
    pub filter_full: bool,
    /// Current EA fault code
    pub fault_ea: u8,
    /// Current high A fault code
    pub fault_a_high: u8,
}

impl FaultReport {
    /// Parse the 17-byte fault payload
    pub fn parse(payload: &[u8]) -> Result<Self, FrameError> {
        if payload.len() != FAULTS_LEN {
            return Err(FrameError::InvalidFrame);
        }

        Ok(Self {
            fault_a: payload[0],
            fault_e: payload[1],
            filter_full: payload[8] != 0,
            fault_ea: payload[9],
            fault_a_high: payload[15],
        })
    }

    /// True when any fault register is non-zero
    pub fn has_fault(&self) -> bool {
        self.fault_a != 0 || self.fault_e != 0 || self.fault_ea != 0 || self.fault_a_high != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_anchor_points() {
        assert_eq!(raw_to_celsius_x10(0x00), -200);
        assert_eq!(raw_to_celsius_x10(0x28), 0);
        assert_eq!(raw_to_celsius_x10(0xE6), -330);
        assert_eq!(raw_to_celsius_x10(0x7F), 435);
        assert_eq!(raw_to_celsius_x10(0x80), -840);
    }

    #[test]
    fn test_temperature_serialize() {
        assert_eq!(celsius_x10_to_raw(-200), 0x00);
        assert_eq!(celsius_x10_to_raw(0), 0x28);
        assert_eq!(celsius_x10_to_raw(-330), 0xE6);
        assert_eq!(celsius_x10_to_raw(210), 0x52);
    }

    #[test]
    fn test_temperature_serialize_rounds_to_half_degree() {
        // 21.2 and 21.3 degrees both land on the 21.0 / 21.5 grid
        assert_eq!(celsius_x10_to_raw(212), 0x52);
        assert_eq!(celsius_x10_to_raw(213), 0x53);
        assert_eq!(celsius_x10_to_raw(-203), 0xFF);
    }

    #[test]
    fn test_temperature_roundtrip_all_bytes() {
        for raw in 0..=u8::MAX {
            assert_eq!(celsius_x10_to_raw(raw_to_celsius_x10(raw)), raw);
        }
    }

    #[test]
    fn test_level_encoding() {
        assert_eq!(level_to_raw(1), 2);
        assert_eq!(level_to_raw(3), 4);
    }

    #[test]
    fn test_temperature_report_flag_gating() {
        let payload = [0x28, 0x30, 0x2A, 0x10, 0xE6, 0x05, 0, 0, 0];
        let report = TemperatureReport::parse(&payload).unwrap();

        assert_eq!(report.comfort_x10, 0);
        assert_eq!(report.outside_x10, Some(40));
        assert_eq!(report.supply_x10, None);
        assert_eq!(report.extract_x10, Some(-120));
        assert_eq!(report.exhaust_x10, None);
    }

    #[test]
    fn test_temperature_report_rejects_wrong_size() {
        assert_eq!(
            TemperatureReport::parse(&[0; 8]),
            Err(FrameError::InvalidFrame)
        );
    }

    #[test]
    fn test_bypass_status_unknown_sentinel() {
        let status = BypassStatus::parse(&[0xFF, 0, 0, 0]).unwrap();
        assert_eq!(status.percent, None);

        let status = BypassStatus::parse(&[100, 0, 0, 0]).unwrap();
        assert_eq!(status.percent, Some(100));
    }

    #[test]
    fn test_ventilation_status_level_offset() {
        let mut payload = [0u8; VENTILATION_LEVELS_LEN];
        payload[8] = 3;
        let status = VentilationStatus::parse(&payload).unwrap();
        assert_eq!(status.current_level, Some(2));

        payload[8] = 0;
        let status = VentilationStatus::parse(&payload).unwrap();
        assert_eq!(status.current_level, None);
    }

    #[test]
    fn test_fault_report_layout() {
        let mut payload = [0u8; FAULTS_LEN];
        payload[0] = 0x11;
        payload[1] = 0x22;
        payload[8] = 1;
        payload[9] = 0x33;
        payload[15] = 0x44;

        let report = FaultReport::parse(&payload).unwrap();
        assert_eq!(report.fault_a, 0x11);
        assert_eq!(report.fault_e, 0x22);
        assert!(report.filter_full);
        assert_eq!(report.fault_ea, 0x33);
        assert_eq!(report.fault_a_high, 0x44);
        assert!(report.has_fault());

        let clean = FaultReport::parse(&[0u8; FAULTS_LEN]).unwrap();
        assert!(!clean.has_fault());
        assert!(!clean.filter_full);
    }
}
