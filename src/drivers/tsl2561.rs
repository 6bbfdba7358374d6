/*
 *  drivers/tsl2561.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  TAOS TSL2560/TSL2561 light-to-digital converter
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
use log::debug;

use crate::bus::BusAddress;
use crate::drivers::{self, DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

const COMMAND: u8 = 0x80;
const WORD: u8 = 0x20;

const REG_CONTROL: u8 = 0x00;
const REG_TIMING: u8 = 0x01;
const REG_ID: u8 = 0x0A;
const REG_DATA0: u8 = 0x0C;
const REG_DATA1: u8 = 0x0E;

const POWER_UP: u8 = 0x03;
/// 16x gain, 402 ms integration - the scale the lux coefficients assume.
const TIMING_16X_402MS: u8 = 0x12;

/// ID register: part number in the high nibble, 0 = TSL2560, 1 = TSL2561.
const PART_TSL2561: u8 = 0x10;

#[derive(Debug)]
pub struct Tsl2561 {
    address: BusAddress,
}

fn channel<B: I2c>(bus: &mut B, address: BusAddress, register: u8) -> Result<u16, DriverError> {
    let mut raw = [0u8; 2];
    drivers::read_registers(bus, address, COMMAND | WORD | register, &mut raw)?;
    Ok(u16::from_le_bytes(raw))
}

/// Empirical lux approximation for the T/FN/CL package.
pub fn lux(ch0: u16, ch1: u16) -> f32 {
    if ch0 == 0 {
        return 0.0;
    }
    let (c0, c1) = (f32::from(ch0), f32::from(ch1));
    let ratio = c1 / c0;
    let lux = match ratio {
        r if r <= 0.50 => 0.0304 * c0 - 0.062 * c0 * r.powf(1.4),
        r if r <= 0.61 => 0.0224 * c0 - 0.031 * c1,
        r if r <= 0.80 => 0.0128 * c0 - 0.0153 * c1,
        r if r <= 1.30 => 0.00146 * c0 - 0.00112 * c1,
        _ => 0.0,
    };
    lux.max(0.0)
}

impl<B: I2c> DriverAdapter<B> for Tsl2561 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        drivers::write(bus, address, &[COMMAND | REG_CONTROL, POWER_UP])?;

        let id = drivers::read_register(bus, address, COMMAND | REG_ID)?;
        if id >> 4 > 1 {
            return Err(DriverError::IdentityMismatch { expected: PART_TSL2561, found: id });
        }
        debug!("tsl256{} at {} revision {}", id >> 4, address, id & 0x0F);

        drivers::write(bus, address, &[COMMAND | REG_TIMING, TIMING_16X_402MS])?;
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Tsl2561 {
    fn family(&self) -> DriverTag {
        DriverTag::Tsl2561
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        let broadband = channel(bus, self.address, REG_DATA0)?;
        let infrared = channel(bus, self.address, REG_DATA1)?;
        Ok(Readings {
            illuminance_lux: Some(lux(broadband, infrared)),
            raw_index: Some(u32::from(broadband)),
            ..Default::default()
        })
    }
}
