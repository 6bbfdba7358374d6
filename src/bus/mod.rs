/*
 *  bus/mod.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Two-wire bus plumbing - addresses, transport errors, scanning
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

//! The bus transport itself is anything implementing
//! [`embedded_hal::i2c::I2c`]. On Linux that is `linux_embedded_hal::I2cdev`;
//! tests and the `--emulated` mode use [`EmulatedBus`].
//!
//! Every call through the trait is a complete transaction terminated by a
//! STOP condition, so a failed transfer never leaves the bus mid-frame for
//! the next device.

pub mod address;
pub mod error;
pub mod scanner;
pub mod emulated;

pub use address::{BusAddress, InvalidAddress};
pub use error::BusError;
pub use scanner::BusScanner;
pub use emulated::{EmulatedBus, EmulatedDevice};
