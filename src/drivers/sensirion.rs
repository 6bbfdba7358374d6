/*
 *  drivers/sensirion.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sensirion command framing - 16-bit commands, CRC-8 guarded words
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

use crate::bus::BusAddress;
use crate::drivers::{self, DriverError};

/// CRC-8, polynomial 0x31, init 0xFF, as used on every Sensirion word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0xFFu8;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

pub fn command<B: I2c>(bus: &mut B, address: BusAddress, cmd: u16) -> Result<(), DriverError> {
    drivers::write(bus, address, &cmd.to_be_bytes())
}

/// Command followed by argument words, each with its CRC.
pub fn command_with_args<B: I2c>(
    bus: &mut B,
    address: BusAddress,
    cmd: u16,
    args: &[u16],
) -> Result<(), DriverError> {
    let mut frame = Vec::with_capacity(2 + args.len() * 3);
    frame.extend_from_slice(&cmd.to_be_bytes());
    for arg in args {
        let pair = arg.to_be_bytes();
        frame.extend_from_slice(&pair);
        frame.push(crc8(&pair));
    }
    drivers::write(bus, address, &frame)
}

/// Read `words.len()` CRC-guarded words.
pub fn read_words<B: I2c>(
    bus: &mut B,
    address: BusAddress,
    words: &mut [u16],
    context: &'static str,
) -> Result<(), DriverError> {
    let mut raw = vec![0u8; words.len() * 3];
    drivers::read(bus, address, &mut raw)?;
    for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(3)) {
        if crc8(&chunk[..2]) != chunk[2] {
            return Err(DriverError::Checksum(context));
        }
        *word = u16::from_be_bytes([chunk[0], chunk[1]]);
    }
    Ok(())
}
