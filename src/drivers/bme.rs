/*
 *  drivers/bme.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Bosch BME280 / BME680 climate sensors sharing 0x76/0x77
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

//! Both parts live at the same two addresses and are told apart by the
//! chip-identity register. Each driver re-checks the identity on startup and
//! reports [`DriverError::IdentityMismatch`] so the dispatcher can fall back
//! to the other variant.
//!
//! Only temperature is compensated here; pressure, humidity and gas
//! resistance need the full Bosch calibration blocks.

use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;
use log::debug;

use crate::bus::BusAddress;
use crate::drivers::{self, DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

pub const REG_CHIP_ID: u8 = 0xD0;
pub const BME280_CHIP_ID: u8 = 0x60;
pub const BME680_CHIP_ID: u8 = 0x61;

const REG_RESET: u8 = 0xE0;
const RESET_WORD: u8 = 0xB6;

const ADC_SKIPPED: i64 = 0x80000;

fn check_identity<B: I2c>(bus: &mut B, address: BusAddress, expected: u8) -> Result<(), DriverError> {
    let found = drivers::read_register(bus, address, REG_CHIP_ID)?;
    if found != expected {
        return Err(DriverError::IdentityMismatch { expected, found });
    }
    Ok(())
}

fn soft_reset<B: I2c>(bus: &mut B, address: BusAddress) -> Result<(), DriverError> {
    drivers::write(bus, address, &[REG_RESET, RESET_WORD])?;
    thread::sleep(Duration::from_millis(5));
    Ok(())
}

/// 20-bit ADC value from msb/lsb/xlsb registers.
fn adc20(raw: [u8; 3]) -> i64 {
    (i64::from(raw[0]) << 12) | (i64::from(raw[1]) << 4) | (i64::from(raw[2]) >> 4)
}

// -- BME280

const BME280_REG_CALIB_T: u8 = 0x88;
const BME280_REG_CTRL_HUM: u8 = 0xF2;
const BME280_REG_CTRL_MEAS: u8 = 0xF4;
const BME280_REG_TEMP: u8 = 0xFA;

#[derive(Debug)]
pub struct Bme280 {
    address: BusAddress,
    dig_t1: u16,
    dig_t2: i16,
    dig_t3: i16,
}

impl Bme280 {
    fn compensate(&self, adc: i64) -> f32 {
        let t1 = i64::from(self.dig_t1);
        let var1 = (((adc >> 3) - (t1 << 1)) * i64::from(self.dig_t2)) >> 11;
        let var2 = (((((adc >> 4) - t1) * ((adc >> 4) - t1)) >> 12) * i64::from(self.dig_t3)) >> 14;
        let t_fine = var1 + var2;
        ((t_fine * 5 + 128) >> 8) as f32 / 100.0
    }
}

impl<B: I2c> DriverAdapter<B> for Bme280 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        check_identity(bus, address, BME280_CHIP_ID)?;
        soft_reset(bus, address)?;

        let mut calib = [0u8; 6];
        drivers::read_registers(bus, address, BME280_REG_CALIB_T, &mut calib)?;

        // humidity x1 must be written before ctrl_meas to take effect
        drivers::write(bus, address, &[BME280_REG_CTRL_HUM, 0x01])?;
        // temperature x1, pressure x1, normal mode
        drivers::write(bus, address, &[BME280_REG_CTRL_MEAS, 0x27])?;

        let sensor = Self {
            address,
            dig_t1: u16::from_le_bytes([calib[0], calib[1]]),
            dig_t2: i16::from_le_bytes([calib[2], calib[3]]),
            dig_t3: i16::from_le_bytes([calib[4], calib[5]]),
        };
        debug!("bme280 at {} calibration {:?}", address, sensor);
        Ok(sensor)
    }
}

impl<B: I2c> SensorDriver<B> for Bme280 {
    fn family(&self) -> DriverTag {
        DriverTag::Bme280
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        let mut raw = [0u8; 3];
        drivers::read_registers(bus, self.address, BME280_REG_TEMP, &mut raw)?;
        let adc = adc20(raw);
        if adc == ADC_SKIPPED {
            return Err(DriverError::NotReady);
        }
        Ok(Readings {
            temperature_c: Some(self.compensate(adc)),
            ..Default::default()
        })
    }
}

// -- BME680

const BME680_REG_PAR_T1: u8 = 0xE9;
const BME680_REG_PAR_T2: u8 = 0x8A;
const BME680_REG_CTRL_MEAS: u8 = 0x74;
const BME680_REG_TEMP: u8 = 0x22;

#[derive(Debug)]
pub struct Bme680 {
    address: BusAddress,
    par_t1: u16,
    par_t2: i16,
    par_t3: i8,
}

impl Bme680 {
    fn compensate(&self, adc: i64) -> f32 {
        let var1 = (adc >> 3) - (i64::from(self.par_t1) << 1);
        let var2 = (var1 * i64::from(self.par_t2)) >> 11;
        let var3 = ((((var1 >> 1) * (var1 >> 1)) >> 12) * (i64::from(self.par_t3) << 4)) >> 14;
        let t_fine = var2 + var3;
        ((t_fine * 5 + 128) >> 8) as f32 / 100.0
    }
}

impl<B: I2c> DriverAdapter<B> for Bme680 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        check_identity(bus, address, BME680_CHIP_ID)?;
        soft_reset(bus, address)?;

        let mut t1 = [0u8; 2];
        drivers::read_registers(bus, address, BME680_REG_PAR_T1, &mut t1)?;
        let mut t23 = [0u8; 3];
        drivers::read_registers(bus, address, BME680_REG_PAR_T2, &mut t23)?;

        let sensor = Self {
            address,
            par_t1: u16::from_le_bytes(t1),
            par_t2: i16::from_le_bytes([t23[0], t23[1]]),
            par_t3: t23[2] as i8,
        };
        debug!("bme680 at {} calibration {:?}", address, sensor);
        Ok(sensor)
    }
}

impl<B: I2c> SensorDriver<B> for Bme680 {
    fn family(&self) -> DriverTag {
        DriverTag::Bme680
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        // temperature x1, forced mode
        drivers::write(bus, self.address, &[BME680_REG_CTRL_MEAS, 0x21])?;
        thread::sleep(Duration::from_millis(10));

        let mut raw = [0u8; 3];
        drivers::read_registers(bus, self.address, BME680_REG_TEMP, &mut raw)?;
        let adc = adc20(raw);
        if adc == ADC_SKIPPED {
            return Err(DriverError::NotReady);
        }
        Ok(Readings {
            temperature_c: Some(self.compensate(adc)),
            ..Default::default()
        })
    }
}
