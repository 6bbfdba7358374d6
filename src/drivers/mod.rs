/*
 *  drivers/mod.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Driver capability interface and the built-in drivers
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

use crate::bus::{BusAddress, BusError};
use crate::registry::DriverTag;

pub mod error;
pub mod readings;
pub mod sensirion;

pub mod aht20;
pub mod bh1750;
pub mod bme;
pub mod ds1307;
pub mod scd30;
pub mod sgp;
pub mod sht3x;
pub mod ssd1305;
pub mod tsl2561;

pub use error::DriverError;
pub use readings::Readings;
pub use ssd1305::{PanelConfig, PowerState, Ssd1305};

/// The one thing every driver, sensor or display, must be able to do:
/// bring itself up on a given address.
///
/// The bus is borrowed for the call only; a driver never keeps hold of it.
pub trait DriverAdapter<B: I2c>: Sized {
    /// Per-driver startup parameters (panel geometry for displays, `()` for sensors).
    type Settings;

    fn initialize(
        bus: &mut B,
        address: BusAddress,
        settings: &Self::Settings,
    ) -> Result<Self, DriverError>;
}

/// Measurement side of a sensor driver.
pub trait SensorDriver<B: I2c>: std::fmt::Debug {
    fn family(&self) -> DriverTag;

    fn address(&self) -> BusAddress;

    fn read(&mut self, bus: &mut B) -> Result<Readings, DriverError>;
}

// Transport shorthands shared by the drivers

pub(crate) fn write<B: I2c>(bus: &mut B, address: BusAddress, bytes: &[u8]) -> Result<(), DriverError> {
    bus.write(address.get(), bytes).map_err(BusError::from_transport)?;
    Ok(())
}

pub(crate) fn read<B: I2c>(bus: &mut B, address: BusAddress, buf: &mut [u8]) -> Result<(), DriverError> {
    bus.read(address.get(), buf).map_err(BusError::from_transport)?;
    Ok(())
}

pub(crate) fn read_registers<B: I2c>(
    bus: &mut B,
    address: BusAddress,
    register: u8,
    buf: &mut [u8],
) -> Result<(), DriverError> {
    bus.write_read(address.get(), &[register], buf)
        .map_err(BusError::from_transport)?;
    Ok(())
}

pub(crate) fn read_register<B: I2c>(bus: &mut B, address: BusAddress, register: u8) -> Result<u8, DriverError> {
    let mut value = [0u8; 1];
    read_registers(bus, address, register, &mut value)?;
    Ok(value[0])
}
