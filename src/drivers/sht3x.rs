/*
 *  drivers/sht3x.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sensirion SHT30/31/35 temperature and humidity sensor
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

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use log::debug;

use crate::bus::BusAddress;
use crate::drivers::sensirion;
use crate::drivers::{DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

const CMD_SOFT_RESET: u16 = 0x30A2;
const CMD_READ_STATUS: u16 = 0xF32D;
const CMD_MEASURE_HIGH_REP: u16 = 0x2400;

#[derive(Debug)]
pub struct Sht3x {
    address: BusAddress,
}

impl<B: I2c> DriverAdapter<B> for Sht3x {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        sensirion::command(bus, address, CMD_SOFT_RESET)?;
        thread::sleep(Duration::from_millis(2));

        sensirion::command(bus, address, CMD_READ_STATUS)?;
        let mut status = [0u16; 1];
        sensirion::read_words(bus, address, &mut status, "sht3x status")?;
        debug!("sht3x at {} status 0x{:04x}", address, status[0]);

        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Sht3x {
    fn family(&self) -> DriverTag {
        DriverTag::Sht3x
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        sensirion::command(bus, self.address, CMD_MEASURE_HIGH_REP)?;
        thread::sleep(Duration::from_millis(16));

        let mut words = [0u16; 2];
        sensirion::read_words(bus, self.address, &mut words, "sht3x measurement")?;

        Ok(Readings {
            temperature_c: Some(-45.0 + 175.0 * f32::from(words[0]) / 65535.0),
            humidity_pct: Some(100.0 * f32::from(words[1]) / 65535.0),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EmulatedBus, EmulatedDevice};

    fn addr() -> BusAddress {
        BusAddress::new(0x44).unwrap()
    }

    #[test]
    fn test_init_resets_and_checks_status() {
        let mut bus = EmulatedBus::new()
            .with_device(0x44, EmulatedDevice::new().with_words(&[0x8010]));
        Sht3x::initialize(&mut bus, addr(), &()).unwrap();
        assert_eq!(
            bus.device(0x44).unwrap().writes(),
            &[vec![0x30, 0xA2], vec![0xF3, 0x2D]]
        );
    }

    #[test]
    fn test_corrupt_status_is_rejected() {
        let mut bus = EmulatedBus::new()
            .with_device(0x44, EmulatedDevice::new().with_response(&[0x80, 0x10, 0x00]));
        assert_eq!(
            Sht3x::initialize(&mut bus, addr(), &()).unwrap_err(),
            DriverError::Checksum("sht3x status")
        );
    }

    #[test]
    fn test_read_scales_words() {
        let mut bus = EmulatedBus::new().with_device(
            0x44,
            EmulatedDevice::new()
                .with_words(&[0x0000])
                .with_words(&[0x6666, 0x8000]),
        );
        let mut sensor = Sht3x::initialize(&mut bus, addr(), &()).unwrap();
        let r = sensor.read(&mut bus).unwrap();
        assert!((r.temperature_c.unwrap() - 25.0).abs() < 0.01);
        assert!((r.humidity_pct.unwrap() - 50.0).abs() < 0.01);
    }
}
