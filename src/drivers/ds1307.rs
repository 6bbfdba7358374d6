/*
 *  drivers/ds1307.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  DS1307 battery-backed real-time clock
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

use chrono::{NaiveDate, NaiveDateTime};
use embedded_hal::i2c::I2c;
use log::warn;

use crate::bus::BusAddress;
use crate::drivers::{self, DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

const REG_SECONDS: u8 = 0x00;
const CLOCK_HALT: u8 = 0x80;
const HOUR_12H: u8 = 0x40;
const HOUR_PM: u8 = 0x20;

#[derive(Debug)]
pub struct Ds1307 {
    address: BusAddress,
}

fn bcd(value: u8) -> Option<u32> {
    let (tens, units) = (value >> 4, value & 0x0F);
    if tens > 9 || units > 9 {
        return None;
    }
    Some(u32::from(tens * 10 + units))
}

/// Decode the seven timekeeping registers.
pub fn decode(regs: &[u8; 7]) -> Option<NaiveDateTime> {
    let seconds = bcd(regs[0] & 0x7F)?;
    let minutes = bcd(regs[1] & 0x7F)?;
    let hours = if regs[2] & HOUR_12H != 0 {
        let h = bcd(regs[2] & 0x1F)? % 12;
        if regs[2] & HOUR_PM != 0 { h + 12 } else { h }
    } else {
        bcd(regs[2] & 0x3F)?
    };
    let date = bcd(regs[4] & 0x3F)?;
    let month = bcd(regs[5] & 0x1F)?;
    let year = 2000 + bcd(regs[6])? as i32;

    NaiveDate::from_ymd_opt(year, month, date)?.and_hms_opt(hours, minutes, seconds)
}

fn timekeeping<B: I2c>(bus: &mut B, address: BusAddress) -> Result<[u8; 7], DriverError> {
    let mut regs = [0u8; 7];
    drivers::read_registers(bus, address, REG_SECONDS, &mut regs)?;
    Ok(regs)
}

impl<B: I2c> DriverAdapter<B> for Ds1307 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        // never-set clocks power up halted with zeroed registers
        let regs = timekeeping(bus, address)?;
        if regs[0] & CLOCK_HALT != 0 {
            warn!("ds1307 at {} oscillator halted, time is not advancing", address);
        }
        if decode(&regs).is_none() {
            warn!("ds1307 at {} holds no valid time {:02x?}", address, regs);
        }
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Ds1307 {
    fn family(&self) -> DriverTag {
        DriverTag::Ds1307
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        let regs = timekeeping(bus, self.address)?;
        let now = decode(&regs)
            .ok_or_else(|| DriverError::Malformed(format!("timekeeping registers {:02x?}", regs)))?;
        Ok(Readings {
            clock: Some(now),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EmulatedBus, EmulatedDevice};

    #[test]
    fn test_decode_24h() {
        let t = decode(&[0x45, 0x30, 0x17, 0x05, 0x16, 0x10, 0x26]).unwrap();
        assert_eq!(t.to_string(), "2026-10-16 17:30:45");
    }

    #[test]
    fn test_decode_12h_pm() {
        let t = decode(&[0x00, 0x05, HOUR_12H | HOUR_PM | 0x02, 0x01, 0x01, 0x01, 0x24]).unwrap();
        assert_eq!(t.to_string(), "2024-01-01 14:05:00");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode(&[0x00; 7]).is_none());
        assert!(decode(&[0x5A, 0x00, 0x00, 0x01, 0x01, 0x01, 0x00]).is_none());
    }

    #[test]
    fn test_read_returns_clock() {
        let address = BusAddress::new(0x68).unwrap();
        let mut bus = EmulatedBus::new().with_device(
            0x68,
            EmulatedDevice::new().with_registers(0x00, &[0x80 | 0x10, 0x00, 0x08, 0x01, 0x01, 0x01, 0x00]),
        );
        let mut rtc = Ds1307::initialize(&mut bus, address, &()).unwrap();
        let r = rtc.read(&mut bus).unwrap();
        assert_eq!(r.clock.unwrap().to_string(), "2000-01-01 08:00:10");
    }

    #[test]
    fn test_halted_unset_clock_still_starts() {
        let address = BusAddress::new(0x68).unwrap();
        let mut bus = EmulatedBus::new()
            .with_device(0x68, EmulatedDevice::new().with_register(0x00, CLOCK_HALT));
        let mut rtc = Ds1307::initialize(&mut bus, address, &()).unwrap();
        assert!(matches!(rtc.read(&mut bus), Err(DriverError::Malformed(_))));
    }
}
