/*
 *  drivers/scd30.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sensirion SCD30 NDIR CO2 sensor
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

const CMD_FIRMWARE_VERSION: u16 = 0xD100;
const CMD_START_CONTINUOUS: u16 = 0x0010;
const CMD_DATA_READY: u16 = 0x0202;
const CMD_READ_MEASUREMENT: u16 = 0x0300;

/// The SCD30 needs a pause between command and read.
const READ_DELAY: Duration = Duration::from_millis(3);

#[derive(Debug)]
pub struct Scd30 {
    address: BusAddress,
    firmware: u16,
}

impl Scd30 {
    pub fn firmware(&self) -> (u8, u8) {
        ((self.firmware >> 8) as u8, self.firmware as u8)
    }
}

fn float(hi: u16, lo: u16) -> f32 {
    f32::from_bits((u32::from(hi) << 16) | u32::from(lo))
}

impl<B: I2c> DriverAdapter<B> for Scd30 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        sensirion::command(bus, address, CMD_FIRMWARE_VERSION)?;
        thread::sleep(READ_DELAY);
        let mut version = [0u16; 1];
        sensirion::read_words(bus, address, &mut version, "scd30 firmware version")?;

        // ambient pressure compensation off
        sensirion::command_with_args(bus, address, CMD_START_CONTINUOUS, &[0x0000])?;

        let sensor = Self { address, firmware: version[0] };
        let (major, minor) = sensor.firmware();
        debug!("scd30 at {} firmware {}.{}", address, major, minor);
        Ok(sensor)
    }
}

impl<B: I2c> SensorDriver<B> for Scd30 {
    fn family(&self) -> DriverTag {
        DriverTag::Scd30
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        sensirion::command(bus, self.address, CMD_DATA_READY)?;
        thread::sleep(READ_DELAY);
        let mut ready = [0u16; 1];
        sensirion::read_words(bus, self.address, &mut ready, "scd30 data ready")?;
        if ready[0] != 1 {
            return Err(DriverError::NotReady);
        }

        sensirion::command(bus, self.address, CMD_READ_MEASUREMENT)?;
        thread::sleep(READ_DELAY);
        let mut w = [0u16; 6];
        sensirion::read_words(bus, self.address, &mut w, "scd30 measurement")?;

        Ok(Readings {
            co2_ppm: Some(float(w[0], w[1])),
            temperature_c: Some(float(w[2], w[3])),
            humidity_pct: Some(float(w[4], w[5])),
            ..Default::default()
        })
    }
}
