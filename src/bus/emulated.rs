/*
 *  bus/emulated.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  In-memory two-wire bus for tests and --emulated runs
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

use std::collections::{BTreeMap, VecDeque};

use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, NoAcknowledgeSource, Operation};

use crate::drivers::sensirion::crc8;

/// Which transactions an injected fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaultScope {
    /// Every transaction, including the address-only scan probe.
    Everything,
    /// Only transactions that move data; the address itself still acknowledges.
    DataOnly,
}

/// One emulated peripheral.
///
/// A write sets the register pointer from its first byte and stores any
/// remaining bytes from there on. A read that follows a write inside the same
/// transaction comes from the register file; a plain read takes the next
/// canned response, falling back to the register file when none is queued.
#[derive(Debug, Clone)]
pub struct EmulatedDevice {
    registers: Vec<u8>,
    pointer: u8,
    responses: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    fault: Option<(ErrorKind, FaultScope)>,
}

impl Default for EmulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatedDevice {
    pub fn new() -> Self {
        Self {
            registers: vec![0; 256],
            pointer: 0,
            responses: VecDeque::new(),
            writes: Vec::new(),
            fault: None,
        }
    }

    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers[register as usize] = value;
        self
    }

    pub fn with_registers(mut self, start: u8, values: &[u8]) -> Self {
        for (i, &value) in values.iter().enumerate() {
            self.registers[start.wrapping_add(i as u8) as usize] = value;
        }
        self
    }

    /// Queue raw bytes for the next plain read.
    pub fn with_response(mut self, bytes: &[u8]) -> Self {
        self.responses.push_back(bytes.to_vec());
        self
    }

    /// Queue 16-bit words, each followed by its Sensirion CRC byte.
    pub fn with_words(self, words: &[u16]) -> Self {
        let mut bytes = Vec::with_capacity(words.len() * 3);
        for word in words {
            let pair = word.to_be_bytes();
            bytes.extend_from_slice(&pair);
            bytes.push(crc8(&pair));
        }
        self.with_response(&bytes)
    }

    /// Fail every transaction, the scan probe included.
    pub fn failing(mut self, kind: ErrorKind) -> Self {
        self.fault = Some((kind, FaultScope::Everything));
        self
    }

    /// Acknowledge the address but fail anything that moves data.
    pub fn stalling(mut self, kind: ErrorKind) -> Self {
        self.fault = Some((kind, FaultScope::DataOnly));
        self
    }

    pub fn register(&self, register: u8) -> u8 {
        self.registers[register as usize]
    }

    /// Every non-empty write seen, oldest first.
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    pub fn pending_responses(&self) -> usize {
        self.responses.len()
    }

    fn transfer(&mut self, operations: &mut [Operation<'_>]) -> Result<(), ErrorKind> {
        if let Some((kind, scope)) = self.fault {
            let moves_data = operations.iter().any(|op| match op {
                Operation::Read(buf) => !buf.is_empty(),
                Operation::Write(bytes) => !bytes.is_empty(),
            });
            if scope == FaultScope::Everything || moves_data {
                return Err(kind);
            }
        }

        let mut pointed = false;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    if let Some((&register, data)) = bytes.split_first() {
                        self.writes.push(bytes.to_vec());
                        self.pointer = register;
                        for (i, &value) in data.iter().enumerate() {
                            self.registers[register.wrapping_add(i as u8) as usize] = value;
                        }
                        pointed = true;
                    }
                }
                Operation::Read(buf) => {
                    if !pointed {
                        if let Some(canned) = self.responses.pop_front() {
                            for (i, slot) in buf.iter_mut().enumerate() {
                                *slot = canned.get(i).copied().unwrap_or(0);
                            }
                            continue;
                        }
                    }
                    for slot in buf.iter_mut() {
                        *slot = self.registers[self.pointer as usize];
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                }
            }
        }
        Ok(())
    }
}

/// A bus of emulated devices keyed by raw 7-bit address.
///
/// Unpopulated addresses answer with an address NACK, like real hardware.
#[derive(Debug, Default, Clone)]
pub struct EmulatedBus {
    devices: BTreeMap<u8, EmulatedDevice>,
    wedged: bool,
    transactions: usize,
}

impl EmulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, address: u8, device: EmulatedDevice) -> Self {
        self.devices.insert(address, device);
        self
    }

    pub fn device(&self, address: u8) -> Option<&EmulatedDevice> {
        self.devices.get(&address)
    }

    pub fn device_mut(&mut self, address: u8) -> Option<&mut EmulatedDevice> {
        self.devices.get_mut(&address)
    }

    /// Make every following transaction fail with a bus fault.
    pub fn wedge(&mut self) {
        self.wedged = true;
    }

    pub fn transactions(&self) -> usize {
        self.transactions
    }

    /// A small populated bench: a temperature/humidity sensor at 0x38,
    /// the gas-sensing climate sensor at 0x76, a CO2 sensor at 0x61 and an
    /// SSD1305 panel at 0x3C.
    pub fn demo() -> Self {
        let aht20 = EmulatedDevice::new()
            .with_response(&[0x18])
            .with_response(&[0x18, 0x73, 0x33, 0x35, 0xCC, 0xCD]);

        let bme680 = EmulatedDevice::new()
            .with_register(0xD0, 0x61)
            .with_registers(0xE9, &[0x90, 0x65])
            .with_registers(0x8A, &[0xA4, 0x66, 0x03])
            .with_registers(0x22, &[0x7A, 0x12, 0x00]);

        let scd30 = EmulatedDevice::new()
            .with_words(&[0x0342])
            .with_words(&[0x0001])
            .with_words(&[0x4419, 0x2000, 0x41BA, 0x0000, 0x4226, 0x0000]);

        Self::new()
            .with_device(0x38, aht20)
            .with_device(0x3C, EmulatedDevice::new())
            .with_device(0x61, scd30)
            .with_device(0x76, bme680)
    }
}

impl ErrorType for EmulatedBus {
    type Error = ErrorKind;
}

impl I2c for EmulatedBus {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.transactions += 1;
        if self.wedged {
            return Err(ErrorKind::Bus);
        }
        let device = self
            .devices
            .get_mut(&address)
            .ok_or(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address))?;
        device.transfer(operations)
    }
}
