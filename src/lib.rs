/*
 *  lib.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Two-wire bus discovery and driver dispatch
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

pub mod bus;
pub mod config;
pub mod dispatch;
pub mod drivers;
pub mod registry;
pub mod report;

pub use bus::{BusAddress, BusError, BusScanner, EmulatedBus, EmulatedDevice};
pub use dispatch::{survey, DetectedDevice, DeviceDispatcher, DriverHandle, Outcome};
pub use drivers::{DriverAdapter, DriverError, PanelConfig, Readings, SensorDriver, Ssd1305};
pub use registry::{AddressRegistry, DeviceDescriptor, DisambiguationProbe, DriverTag, RegistryError};
