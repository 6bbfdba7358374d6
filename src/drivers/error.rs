/*
 *  drivers/error.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Unified error type for driver initialization and reads
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use thiserror::Error;

use crate::bus::BusError;

/// Everything that can go wrong once a device has answered its address.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriverError {
    /// The transaction itself failed (NACK, timeout, framing)
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// The chip-identity register names a different part
    #[error("unexpected chip identity: expected 0x{expected:02x}, found 0x{found:02x}")]
    IdentityMismatch { expected: u8, found: u8 },

    #[error("checksum mismatch in {0}")]
    Checksum(&'static str),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no measurement ready")]
    NotReady,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl DriverError {
    /// True when the device stopped answering, as opposed to answering wrongly.
    pub fn is_transport(&self) -> bool {
        matches!(self, DriverError::Bus(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        assert!(DriverError::from(BusError::Other("timeout".into())).is_transport());
        assert!(!DriverError::IdentityMismatch { expected: 0x60, found: 0x58 }.is_transport());
        assert!(!DriverError::Checksum("status word").is_transport());
    }

    #[test]
    fn test_identity_message() {
        let err = DriverError::IdentityMismatch { expected: 0x60, found: 0x61 };
        assert_eq!(err.to_string(), "unexpected chip identity: expected 0x60, found 0x61");
    }
}
