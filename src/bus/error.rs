/*
 *  bus/error.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Transport error classification
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

use embedded_hal::i2c::{Error as I2cError, ErrorKind, NoAcknowledgeSource};
use thiserror::Error;

/// A failed bus transaction, classified from the transport's `ErrorKind`.
///
/// Only [`BusError::Bus`] and [`BusError::ArbitrationLoss`] say anything about
/// the bus as a whole. Everything else is scoped to the device being addressed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    #[error("no acknowledge ({0})")]
    NoAcknowledge(NoAcknowledgeSource),

    #[error("arbitration lost")]
    ArbitrationLoss,

    #[error("bus fault (misplaced start or stop condition)")]
    Bus,

    #[error("receive overrun")]
    Overrun,

    /// Anything the transport could not classify; Linux timeouts land here.
    #[error("transport error: {0}")]
    Other(String),
}

impl BusError {
    pub fn from_transport<E: I2cError>(err: E) -> Self {
        match err.kind() {
            ErrorKind::NoAcknowledge(source) => BusError::NoAcknowledge(source),
            ErrorKind::ArbitrationLoss => BusError::ArbitrationLoss,
            ErrorKind::Bus => BusError::Bus,
            ErrorKind::Overrun => BusError::Overrun,
            _ => BusError::Other(format!("{:?}", err)),
        }
    }

    /// True when the bus itself is unusable rather than one device.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BusError::Bus | BusError::ArbitrationLoss)
    }
}
