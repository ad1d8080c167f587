//! BLE GATT contract for ledlink LED boards
//!
//! Defines the service and characteristic UUIDs exposed by the ESP32-class
//! firmware and the command payloads clients write to it. Shared by every
//! client crate so the contract lives in one place.

use std::fmt;
use std::str::FromStr;

/// LED Service UUID advertised by the board
pub const SERVICE_UUID: &str = "19b10000-e8f2-537e-4f6c-d104768a1214";

/// LED Characteristic UUID (write)
pub const LED_CHAR_UUID: &str = "19b10001-e8f2-537e-4f6c-d104768a1214";

/// Advertised local-name prefix of ledlink boards
pub const DEVICE_NAME_PREFIX: &str = "ESP32";

/// Command payloads, written raw to the LED characteristic
pub mod commands {
    /// Turn the LED on
    pub const ON: &[u8] = b"ON";

    /// Turn the LED off
    pub const OFF: &[u8] = b"OFF";
}

/// The two commands the LED characteristic accepts.
///
/// The wire form is the raw UTF-8 text in [`commands`]; there is no framing
/// and no other payload the firmware understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    On,
    Off,
}

impl LedCommand {
    /// The exact bytes written to the characteristic
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LedCommand::On => commands::ON,
            LedCommand::Off => commands::OFF,
        }
    }
}

impl fmt::Display for LedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedCommand::On => write!(f, "ON"),
            LedCommand::Off => write!(f, "OFF"),
        }
    }
}

/// Error for strings that are neither "on" nor "off"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseLedCommandError(pub String);

impl fmt::Display for ParseLedCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown LED command: {:?} (expected \"on\" or \"off\")", self.0)
    }
}

impl std::error::Error for ParseLedCommandError {}

impl FromStr for LedCommand {
    type Err = ParseLedCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("on") => Ok(LedCommand::On),
            s if s.eq_ignore_ascii_case("off") => Ok(LedCommand::Off),
            other => Err(ParseLedCommandError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_bytes() {
        assert_eq!(LedCommand::On.as_bytes(), b"ON");
        assert_eq!(LedCommand::Off.as_bytes(), b"OFF");
    }

    #[test]
    fn parse_commands() {
        assert_eq!("on".parse::<LedCommand>(), Ok(LedCommand::On));
        assert_eq!("OFF".parse::<LedCommand>(), Ok(LedCommand::Off));
        assert_eq!(" On ".parse::<LedCommand>(), Ok(LedCommand::On));
        assert!("toggle".parse::<LedCommand>().is_err());
        assert!("".parse::<LedCommand>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for cmd in [LedCommand::On, LedCommand::Off] {
            assert_eq!(cmd.to_string().parse::<LedCommand>(), Ok(cmd));
        }
    }

    #[test]
    fn uuids_are_valid() {
        assert!(uuid::Uuid::parse_str(SERVICE_UUID).is_ok());
        assert!(uuid::Uuid::parse_str(LED_CHAR_UUID).is_ok());
    }
}
