/*
 *  drivers/sgp.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sensirion SGP30 / SGP40 air quality sensors
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
use crate::drivers::sensirion;
use crate::drivers::{DriverAdapter, DriverError, Readings, SensorDriver};
use crate::registry::DriverTag;

// -- SGP30

const SGP30_INIT_AIR_QUALITY: u16 = 0x2003;
const SGP30_MEASURE_AIR_QUALITY: u16 = 0x2008;

/// Equivalent CO2 and TVOC. Values stay at 400 ppm / 0 ppb for the first ~15 s.
#[derive(Debug)]
pub struct Sgp30 {
    address: BusAddress,
}

impl<B: I2c> DriverAdapter<B> for Sgp30 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        sensirion::command(bus, address, SGP30_INIT_AIR_QUALITY)?;
        thread::sleep(Duration::from_millis(10));
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Sgp30 {
    fn family(&self) -> DriverTag {
        DriverTag::Sgp30
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        sensirion::command(bus, self.address, SGP30_MEASURE_AIR_QUALITY)?;
        thread::sleep(Duration::from_millis(12));

        let mut words = [0u16; 2];
        sensirion::read_words(bus, self.address, &mut words, "sgp30 air quality")?;
        Ok(Readings {
            co2_ppm: Some(f32::from(words[0])),
            tvoc_ppb: Some(words[1]),
            ..Default::default()
        })
    }
}

// -- SGP40

const SGP40_SELF_TEST: u16 = 0x280E;
const SGP40_MEASURE_RAW: u16 = 0x260F;
const SGP40_SELF_TEST_PASSED: u16 = 0xD400;

/// Compensation defaults: 50 %RH, 25 °C.
const SGP40_DEFAULT_HUMIDITY: u16 = 0x8000;
const SGP40_DEFAULT_TEMPERATURE: u16 = 0x6666;

/// Raw VOC signal; the VOC index algorithm runs outside the driver.
#[derive(Debug)]
pub struct Sgp40 {
    address: BusAddress,
}

impl<B: I2c> DriverAdapter<B> for Sgp40 {
    type Settings = ();

    fn initialize(bus: &mut B, address: BusAddress, _: &()) -> Result<Self, DriverError> {
        sensirion::command(bus, address, SGP40_SELF_TEST)?;
        thread::sleep(Duration::from_millis(320));

        let mut result = [0u16; 1];
        sensirion::read_words(bus, address, &mut result, "sgp40 self test")?;
        if result[0] != SGP40_SELF_TEST_PASSED {
            return Err(DriverError::Malformed(format!("self test returned 0x{:04x}", result[0])));
        }
        Ok(Self { address })
    }
}

impl<B: I2c> SensorDriver<B> for Sgp40 {
    fn family(&self) -> DriverTag {
        DriverTag::Sgp40
    }

    fn address(&self) -> BusAddress {
        self.address
    }

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError> {
        sensirion::command_with_args(
            bus,
            self.address,
            SGP40_MEASURE_RAW,
            &[SGP40_DEFAULT_HUMIDITY, SGP40_DEFAULT_TEMPERATURE],
        )?;
        thread::sleep(Duration::from_millis(30));

        let mut raw = [0u16; 1];
        sensirion::read_words(bus, self.address, &mut raw, "sgp40 raw signal")?;
        Ok(Readings {
            raw_index: Some(u32::from(raw[0])),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EmulatedBus, EmulatedDevice};

    #[test]
    fn test_sgp30_reads_eco2_and_tvoc() {
        let address = BusAddress::new(0x58).unwrap();
        let mut bus = EmulatedBus::new()
            .with_device(0x58, EmulatedDevice::new().with_words(&[450, 12]));
        let mut sensor = Sgp30::initialize(&mut bus, address, &()).unwrap();
        let r = sensor.read(&mut bus).unwrap();

        assert_eq!(r.co2_ppm, Some(450.0));
        assert_eq!(r.tvoc_ppb, Some(12));
        assert_eq!(bus.device(0x58).unwrap().writes()[0], vec![0x20, 0x03]);
    }

    #[test]
    fn test_sgp40_self_test_failure_is_rejected() {
        let address = BusAddress::new(0x59).unwrap();
        let mut bus = EmulatedBus::new()
            .with_device(0x59, EmulatedDevice::new().with_words(&[0x4B00]));
        let err = Sgp40::initialize(&mut bus, address, &()).unwrap_err();
        assert!(matches!(err, DriverError::Malformed(_)));
    }

    #[test]
    fn test_sgp40_measure_sends_default_compensation() {
        let address = BusAddress::new(0x59).unwrap();
        let mut bus = EmulatedBus::new().with_device(
            0x59,
            EmulatedDevice::new().with_words(&[0xD400]).with_words(&[31000]),
        );
        let mut sensor = Sgp40::initialize(&mut bus, address, &()).unwrap();
        let r = sensor.read(&mut bus).unwrap();

        assert_eq!(r.raw_index, Some(31000));
        assert_eq!(
            bus.device(0x59).unwrap().writes().last().unwrap(),
            &vec![0x26, 0x0F, 0x80, 0x00, 0xA2, 0x66, 0x66, 0x93]
        );
    }
}
