/*
 *  drivers/bh1750.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  BH1750 ambient light sensor
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

use crate::bus::BusAddress;
use crate::drivers::{self, DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

const POWER_ON: u8 = 0x01;
const CONTINUOUS_HIGH_RES: u8 = 0x10;

/// Counts per lux at the default measurement time.
const COUNTS_PER_LUX: f32 = 1.2;

#[derive(Debug)]
pub struct Bh1750 {
    address: BusAddress,
}

impl<B: I2c> DriverAdapter<B> for Bh1750 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        drivers::write(bus, address, &[POWER_ON])?;
        drivers::write(bus, address, &[CONTINUOUS_HIGH_RES])?;
        // first high-res conversion
        thread::sleep(Duration::from_millis(180));
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Bh1750 {
    fn family(&self) -> DriverTag {
        DriverTag::Bh1750
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        let mut raw = [0u8; 2];
        drivers::read(bus, self.address, &mut raw)?;
        Ok(Readings {
            illuminance_lux: Some(f32::from(u16::from_be_bytes(raw)) / COUNTS_PER_LUX),
            ..Default::default()
        })
    }
}
