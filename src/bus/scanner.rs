/*
 *  bus/scanner.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Address enumeration by zero-length write probes
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

use embedded_hal::i2c::I2c;
use log::{debug, error, trace};

use crate::bus::{BusAddress, BusError};

/// Walks 0x08..=0x77 and reports every address that acknowledges.
///
/// Each call is an independent pass over the bus. No address is retried and
/// no data is interpreted; a missing acknowledge just means nobody is there.
///
/// On Linux, `linux-embedded-hal` reports EIO, EINVAL and EBUSY as
/// `ErrorKind::Bus`. Adapters that signal an address NACK with EIO therefore
/// abort the scan at the first empty address instead of skipping it.
pub struct BusScanner;

impl BusScanner {
    pub fn scan<B: I2c>(bus: &mut B) -> Result<Vec<BusAddress>, BusError> {
        let mut found = Vec::new();

        for address in BusAddress::all() {
            match bus.write(address.get(), &[]) {
                Ok(()) => {
                    debug!("ack at {}", address);
                    found.push(address);
                }
                Err(e) => {
                    let err = BusError::from_transport(e);
                    if err.is_fatal() {
                        error!("bus fault while probing {}: {}", address, err);
                        return Err(err);
                    }
                    trace!("no device at {}: {}", address, err);
                }
            }
        }

        debug!("scan complete, {} device(s) acknowledged", found.len());
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EmulatedBus, EmulatedDevice};
    use embedded_hal::i2c::ErrorKind;

    fn addr(raw: u8) -> BusAddress {
        BusAddress::new(raw).unwrap()
    }

    #[test]
    fn test_scan_empty_bus() {
        let mut bus = EmulatedBus::new();
        assert!(BusScanner::scan(&mut bus).unwrap().is_empty());
    }

    #[test]
    fn test_scan_is_ascending_and_deterministic() {
        let mut bus = EmulatedBus::new()
            .with_device(0x76, EmulatedDevice::new())
            .with_device(0x38, EmulatedDevice::new())
            .with_device(0x3C, EmulatedDevice::new());

        let first = BusScanner::scan(&mut bus).unwrap();
        let second = BusScanner::scan(&mut bus).unwrap();

        assert_eq!(first, vec![addr(0x38), addr(0x3C), addr(0x76)]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_scan_ignores_reserved_addresses() {
        let mut bus = EmulatedBus::new()
            .with_device(0x03, EmulatedDevice::new())
            .with_device(0x7A, EmulatedDevice::new());
        assert!(BusScanner::scan(&mut bus).unwrap().is_empty());
    }

    #[test]
    fn test_stalled_device_still_acknowledges_probe() {
        let mut bus = EmulatedBus::new()
            .with_device(0x77, EmulatedDevice::new().stalling(ErrorKind::Other));
        assert_eq!(BusScanner::scan(&mut bus).unwrap(), vec![addr(0x77)]);
    }

    #[test]
    fn test_overrun_excludes_only_that_address() {
        let mut bus = EmulatedBus::new()
            .with_device(0x23, EmulatedDevice::new().failing(ErrorKind::Overrun))
            .with_device(0x68, EmulatedDevice::new());
        assert_eq!(BusScanner::scan(&mut bus).unwrap(), vec![addr(0x68)]);
    }

    #[test]
    fn test_wedged_bus_is_fatal() {
        let mut bus = EmulatedBus::new().with_device(0x38, EmulatedDevice::new());
        bus.wedge();
        assert_eq!(BusScanner::scan(&mut bus), Err(BusError::Bus));
    }
}
