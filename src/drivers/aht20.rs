/*
 *  drivers/aht20.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  AHT10/AHT20 temperature and humidity sensor
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
use crate::drivers::{self, DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

const CMD_CALIBRATE: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

const FULL_SCALE: f32 = 1_048_576.0; // 2^20

#[derive(Debug)]
pub struct Aht20 {
    address: BusAddress,
}

fn status<B: I2c>(bus: &mut B, address: BusAddress) -> Result<u8, DriverError> {
    let mut status = [0u8; 1];
    drivers::read(bus, address, &mut status)?;
    Ok(status[0])
}

impl<B: I2c> DriverAdapter<B> for Aht20 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        if status(bus, address)? & STATUS_CALIBRATED == 0 {
            debug!("aht20 at {} uncalibrated, loading coefficients", address);
            drivers::write(bus, address, &CMD_CALIBRATE)?;
            thread::sleep(Duration::from_millis(10));
            if status(bus, address)? & STATUS_CALIBRATED == 0 {
                return Err(DriverError::Malformed("calibration bit did not latch".into()));
            }
        }
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Aht20 {
    fn family(&self) -> DriverTag {
        DriverTag::Aht20
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        drivers::write(bus, self.address, &CMD_TRIGGER)?;
        thread::sleep(Duration::from_millis(80));

        let mut frame = [0u8; 6];
        drivers::read(bus, self.address, &mut frame)?;
        if frame[0] & STATUS_BUSY != 0 {
            return Err(DriverError::NotReady);
        }

        let raw_h = (u32::from(frame[1]) << 12) | (u32::from(frame[2]) << 4) | (u32::from(frame[3]) >> 4);
        let raw_t = (u32::from(frame[3] & 0x0F) << 16) | (u32::from(frame[4]) << 8) | u32::from(frame[5]);

        Ok(Readings {
            humidity_pct: Some(raw_h as f32 * 100.0 / FULL_SCALE),
            temperature_c: Some(raw_t as f32 * 200.0 / FULL_SCALE - 50.0),
            ..Default::default()
        })
    }
}
