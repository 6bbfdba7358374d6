/*
 *  bus/address.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  7-bit bus address newtype restricted to the scannable range
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

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a raw value falls outside the scannable address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("bus address 0x{0:02x} outside 0x08..=0x77")]
pub struct InvalidAddress(pub u8);

/// A 7-bit address in 0x08..=0x77.
///
/// The reserved blocks at either end of the 7-bit space are never probed,
/// so they can't be represented here either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BusAddress(u8);

impl BusAddress {
    pub const FIRST: u8 = 0x08;
    pub const LAST: u8 = 0x77;

    pub const fn new(raw: u8) -> Option<Self> {
        if raw >= Self::FIRST && raw <= Self::LAST {
            Some(Self(raw))
        } else {
            None
        }
    }

    /// Const constructor for compile-time tables; out-of-range values fail the build.
    pub(crate) const fn known(raw: u8) -> Self {
        assert!(raw >= Self::FIRST && raw <= Self::LAST, "address outside scan range");
        Self(raw)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Every scannable address, ascending.
    pub fn all() -> impl Iterator<Item = BusAddress> {
        (Self::FIRST..=Self::LAST).map(BusAddress)
    }
}

impl TryFrom<u8> for BusAddress {
    type Error = InvalidAddress;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(InvalidAddress(raw))
    }
}

impl From<BusAddress> for u8 {
    fn from(address: BusAddress) -> Self {
        address.0
    }
}

impl fmt::Display for BusAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_edges() {
        assert!(BusAddress::new(0x07).is_none());
        assert!(BusAddress::new(0x08).is_some());
        assert!(BusAddress::new(0x77).is_some());
        assert!(BusAddress::new(0x78).is_none());
        assert_eq!(BusAddress::try_from(0x80), Err(InvalidAddress(0x80)));
    }

    #[test]
    fn test_all_is_ascending_and_complete() {
        let all: Vec<u8> = BusAddress::all().map(BusAddress::get).collect();
        assert_eq!(all.len(), 0x77 - 0x08 + 1);
        assert_eq!(all.first(), Some(&0x08));
        assert_eq!(all.last(), Some(&0x77));
        assert!(all.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_display_is_lower_hex() {
        assert_eq!(BusAddress::known(0x3C).to_string(), "0x3c");
    }

    #[test]
    fn test_yaml_rejects_out_of_range() {
        let ok: Vec<BusAddress> = serde_yaml::from_str("[56, 118]").unwrap();
        assert_eq!(ok, vec![BusAddress::known(0x38), BusAddress::known(0x76)]);
        assert!(serde_yaml::from_str::<Vec<BusAddress>>("[3]").is_err());
    }
}
