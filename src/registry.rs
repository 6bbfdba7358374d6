/*
 *  registry.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Address registry - which driver families may live at which bus address
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

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bus::BusAddress;

/// One variant per built-in driver. Selecting a driver never goes through a
/// string lookup; the YAML names below are only the serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverTag {
    Aht20,
    Bme280,
    Bme680,
    Bh1750,
    Sht3x,
    Sgp30,
    Sgp40,
    Scd30,
    Tsl2561,
    Ssd1305,
    Ds1307,
}

impl DriverTag {
    pub fn name(&self) -> &'static str {
        match self {
            DriverTag::Aht20 => "aht20",
            DriverTag::Bme280 => "bme280",
            DriverTag::Bme680 => "bme680",
            DriverTag::Bh1750 => "bh1750",
            DriverTag::Sht3x => "sht3x",
            DriverTag::Sgp30 => "sgp30",
            DriverTag::Sgp40 => "sgp40",
            DriverTag::Scd30 => "scd30",
            DriverTag::Tsl2561 => "tsl2561",
            DriverTag::Ssd1305 => "ssd1305",
            DriverTag::Ds1307 => "ds1307",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            DriverTag::Aht20 => "temperature/humidity",
            DriverTag::Bme280 => "temperature",
            DriverTag::Bme680 => "temperature, gas-sensing variant",
            DriverTag::Bh1750 => "ambient light",
            DriverTag::Sht3x => "temperature/humidity",
            DriverTag::Sgp30 => "eCO2/TVOC air quality",
            DriverTag::Sgp40 => "VOC air quality",
            DriverTag::Scd30 => "CO2/temperature/humidity",
            DriverTag::Tsl2561 => "ambient light",
            DriverTag::Ssd1305 => "OLED display",
            DriverTag::Ds1307 => "real-time clock",
        }
    }
}

impl fmt::Display for DriverTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identity read used to split an address shared by two families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisambiguationProbe {
    pub register: u8,
    pub expected: u8,
    pub on_match: DriverTag,
    pub otherwise: DriverTag,
}

impl DisambiguationProbe {
    pub fn select(&self, value: u8) -> DriverTag {
        if value == self.expected { self.on_match } else { self.otherwise }
    }

    /// The other outcome of this probe.
    pub fn alternate(&self, tag: DriverTag) -> Option<DriverTag> {
        if tag == self.on_match {
            Some(self.otherwise)
        } else if tag == self.otherwise {
            Some(self.on_match)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub family: String,
    pub driver: DriverTag,
    pub addresses: Vec<BusAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe: Option<DisambiguationProbe>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("descriptor '{family}' lists no addresses")]
    Empty { family: String },
    #[error("address {address} is shared by {drivers:?} but no probe separates them")]
    Ambiguous { address: BusAddress, drivers: Vec<DriverTag> },
}

/// Read-only candidate table, built and validated once at startup.
#[derive(Debug, Clone)]
pub struct AddressRegistry {
    descriptors: Vec<DeviceDescriptor>,
    by_address: BTreeMap<BusAddress, Vec<usize>>,
}

const CHIP_ID_PROBE: DisambiguationProbe = DisambiguationProbe {
    register: crate::drivers::bme::REG_CHIP_ID,
    expected: crate::drivers::bme::BME680_CHIP_ID,
    on_match: DriverTag::Bme680,
    otherwise: DriverTag::Bme280,
};

type Row = (&'static str, DriverTag, &'static [u8], Option<DisambiguationProbe>);

const BUILTIN: &[Row] = &[
    ("AHT20", DriverTag::Aht20, &[0x38], None),
    ("BME280", DriverTag::Bme280, &[0x76, 0x77], Some(CHIP_ID_PROBE)),
    ("BME680", DriverTag::Bme680, &[0x76, 0x77], Some(CHIP_ID_PROBE)),
    ("BH1750", DriverTag::Bh1750, &[0x23], None),
    ("TSL2561", DriverTag::Tsl2561, &[0x29, 0x39, 0x49], None),
    ("SHT3x", DriverTag::Sht3x, &[0x44, 0x45], None),
    ("SGP30", DriverTag::Sgp30, &[0x58], None),
    ("SGP40", DriverTag::Sgp40, &[0x59], None),
    ("SCD30", DriverTag::Scd30, &[0x61], None),
    ("SSD1305", DriverTag::Ssd1305, &[0x3C, 0x3D], None),
    ("DS1307", DriverTag::Ds1307, &[0x68], None),
];

impl AddressRegistry {
    /// The default table of known device families.
    pub fn builtin() -> Self {
        let descriptors = BUILTIN
            .iter()
            .map(|(family, driver, addresses, probe)| DeviceDescriptor {
                family: family.to_string(),
                driver: *driver,
                addresses: addresses.iter().map(|&a| BusAddress::known(a)).collect(),
                probe: *probe,
            })
            .collect::<Vec<_>>();
        let by_address = index(&descriptors);
        Self { descriptors, by_address }
    }

    /// Build from configured descriptors, rejecting tables the dispatcher
    /// could not resolve.
    pub fn from_descriptors(descriptors: Vec<DeviceDescriptor>) -> Result<Self, RegistryError> {
        if let Some(empty) = descriptors.iter().find(|d| d.addresses.is_empty()) {
            return Err(RegistryError::Empty { family: empty.family.clone() });
        }
        let by_address = index(&descriptors);
        for (address, slots) in &by_address {
            if slots.len() < 2 {
                continue;
            }
            let drivers: Vec<DriverTag> = slots.iter().map(|&i| descriptors[i].driver).collect();
            let resolved = slots.iter().all(|&i| {
                descriptors[i].probe.is_some_and(|p| {
                    drivers.contains(&p.on_match) && drivers.contains(&p.otherwise)
                })
            });
            if !resolved || drivers.len() > 2 {
                return Err(RegistryError::Ambiguous { address: *address, drivers });
            }
        }
        Ok(Self { descriptors, by_address })
    }

    /// Descriptors claiming `address`, in declaration order.
    pub fn candidates_for(&self, address: BusAddress) -> Vec<&DeviceDescriptor> {
        self.by_address
            .get(&address)
            .map(|slots| slots.iter().map(|&i| &self.descriptors[i]).collect())
            .unwrap_or_default()
    }

    /// The probe for a shared address, if any.
    pub fn probe_for(&self, address: BusAddress) -> Option<DisambiguationProbe> {
        self.candidates_for(address).iter().find_map(|d| d.probe)
    }

    pub fn descriptors(&self) -> &[DeviceDescriptor] {
        &self.descriptors
    }

    pub fn addresses(&self) -> impl Iterator<Item = BusAddress> + '_ {
        self.by_address.keys().copied()
    }
}

impl Default for AddressRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

fn index(descriptors: &[DeviceDescriptor]) -> BTreeMap<BusAddress, Vec<usize>> {
    let mut map: BTreeMap<BusAddress, Vec<usize>> = BTreeMap::new();
    for (i, d) in descriptors.iter().enumerate() {
        for address in &d.addresses {
            let slots = map.entry(*address).or_default();
            if !slots.contains(&i) {
                slots.push(i);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a(raw: u8) -> BusAddress {
        BusAddress::new(raw).unwrap()
    }

    fn descriptor(driver: DriverTag, addresses: &[u8], probe: Option<DisambiguationProbe>) -> DeviceDescriptor {
        DeviceDescriptor {
            family: driver.name().to_uppercase(),
            driver,
            addresses: addresses.iter().map(|&x| a(x)).collect(),
            probe,
        }
    }

    #[test]
    fn test_builtin_passes_validation() {
        let builtin = AddressRegistry::builtin();
        let rebuilt = AddressRegistry::from_descriptors(builtin.descriptors().to_vec());
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_single_candidate_lookup() {
        let reg = AddressRegistry::builtin();
        let c = reg.candidates_for(a(0x38));
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].driver, DriverTag::Aht20);
        assert!(reg.candidates_for(a(0x50)).is_empty());
    }

    #[test]
    fn test_shared_addresses_carry_probe() {
        let reg = AddressRegistry::builtin();
        for raw in [0x76, 0x77] {
            let drivers: Vec<_> = reg.candidates_for(a(raw)).iter().map(|d| d.driver).collect();
            assert_eq!(drivers, vec![DriverTag::Bme280, DriverTag::Bme680]);
            let probe = reg.probe_for(a(raw)).unwrap();
            assert_eq!(probe.register, 0xD0);
            assert_eq!(probe.select(0x61), DriverTag::Bme680);
            assert_eq!(probe.select(0x60), DriverTag::Bme280);
            assert_eq!(probe.select(0x00), DriverTag::Bme280);
        }
    }

    #[test]
    fn test_probe_alternate() {
        assert_eq!(CHIP_ID_PROBE.alternate(DriverTag::Bme280), Some(DriverTag::Bme680));
        assert_eq!(CHIP_ID_PROBE.alternate(DriverTag::Bme680), Some(DriverTag::Bme280));
        assert_eq!(CHIP_ID_PROBE.alternate(DriverTag::Aht20), None);
    }

    #[test]
    fn test_shared_address_without_probe_rejected() {
        let err = AddressRegistry::from_descriptors(vec![
            descriptor(DriverTag::Ssd1305, &[0x3C], None),
            descriptor(DriverTag::Bh1750, &[0x3C, 0x23], None),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Ambiguous {
                address: a(0x3C),
                drivers: vec![DriverTag::Ssd1305, DriverTag::Bh1750]
            }
        );
    }

    #[test]
    fn test_probe_must_name_both_claimants() {
        let unrelated = DisambiguationProbe {
            register: 0xD0,
            expected: 0x61,
            on_match: DriverTag::Bme680,
            otherwise: DriverTag::Bme280,
        };
        let err = AddressRegistry::from_descriptors(vec![
            descriptor(DriverTag::Sht3x, &[0x44], Some(unrelated)),
            descriptor(DriverTag::Aht20, &[0x44], Some(unrelated)),
        ]);
        assert!(matches!(err, Err(RegistryError::Ambiguous { .. })));
    }

    #[test]
    fn test_empty_descriptor_rejected() {
        let err = AddressRegistry::from_descriptors(vec![descriptor(DriverTag::Aht20, &[], None)]);
        assert_eq!(err.unwrap_err(), RegistryError::Empty { family: "AHT20".into() });
    }

    #[test]
    fn test_yaml_table() {
        let yaml = r#"
- family: OLED
  driver: ssd1305
  addresses: [0x3C]
- family: Lux
  driver: tsl2561
  addresses: [41, 57]
"#;
        let descriptors: Vec<DeviceDescriptor> = serde_yaml::from_str(yaml).unwrap();
        let reg = AddressRegistry::from_descriptors(descriptors).unwrap();
        assert_eq!(reg.addresses().collect::<Vec<_>>(), vec![a(0x29), a(0x39), a(0x3C)]);
        assert_eq!(reg.candidates_for(a(0x3C))[0].driver, DriverTag::Ssd1305);
    }

    #[test]
    fn test_yaml_rejects_reserved_address() {
        let yaml = "- family: Bad\n  driver: aht20\n  addresses: [0x02]\n";
        assert!(serde_yaml::from_str::<Vec<DeviceDescriptor>>(yaml).is_err());
    }

    #[test]
    fn test_descriptions_match_what_is_read() {
        assert_eq!(DriverTag::Bme280.describe(), "temperature");
        assert!(!DriverTag::Bme680.describe().contains("pressure"));
        assert_eq!(DriverTag::Bme680.to_string(), "bme680");
    }
}
