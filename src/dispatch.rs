/*
 *  dispatch.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Device dispatch - resolve each acknowledged address to a running driver
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

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::bus::{BusAddress, BusError, BusScanner};
use crate::drivers::aht20::Aht20;
use crate::drivers::bh1750::Bh1750;
use crate::drivers::bme::{Bme280, Bme680};
use crate::drivers::ds1307::Ds1307;
use crate::drivers::scd30::Scd30;
use crate::drivers::sgp::{Sgp30, Sgp40};
use crate::drivers::sht3x::Sht3x;
use crate::drivers::tsl2561::Tsl2561;
use crate::drivers::{
    self, DriverAdapter, DriverError, PanelConfig, Readings, SensorDriver, Ssd1305,
};
use crate::registry::{AddressRegistry, DriverTag};

/// A started driver. Sensors are type-erased behind the capability trait;
/// the display keeps its concrete type so callers can draw on it.
pub enum DriverHandle<B: I2c> {
    Sensor(Box<dyn SensorDriver<B>>),
    Display(Ssd1305),
}

impl<B: I2c> DriverHandle<B> {
    /// Take a measurement; `None` for a display.
    pub fn read(&mut self, bus: &mut B) -> Option<Result<Readings, DriverError>> {
        match self {
            DriverHandle::Sensor(sensor) => Some(sensor.read(bus)),
            DriverHandle::Display(_) => None,
        }
    }

    pub fn as_display(&mut self) -> Option<&mut Ssd1305> {
        match self {
            DriverHandle::Display(display) => Some(display),
            DriverHandle::Sensor(_) => None,
        }
    }
}

impl<B: I2c> fmt::Debug for DriverHandle<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverHandle::Sensor(sensor) => f.debug_tuple("Sensor").field(sensor).finish(),
            DriverHandle::Display(display) => f.debug_tuple("Display").field(display).finish(),
        }
    }
}

pub enum Outcome<B: I2c> {
    Ready(DriverHandle<B>),
    /// The device acknowledged the scan but its driver could not start.
    Unresponsive(DriverError),
    /// Nothing in the registry claims the address.
    Unclaimed,
}

impl<B: I2c> fmt::Debug for Outcome<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Ready(handle) => f.debug_tuple("Ready").field(handle).finish(),
            Outcome::Unresponsive(err) => f.debug_tuple("Unresponsive").field(err).finish(),
            Outcome::Unclaimed => f.write_str("Unclaimed"),
        }
    }
}

/// Result of dispatching one scanned address.
pub struct DetectedDevice<B: I2c> {
    pub address: BusAddress,
    /// The driver that was (last) tried; `None` when unclaimed or the
    /// disambiguation read itself failed.
    pub tag: Option<DriverTag>,
    pub outcome: Outcome<B>,
}

impl<B: I2c> DetectedDevice<B> {
    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, Outcome::Ready(_))
    }

    pub fn error(&self) -> Option<&DriverError> {
        match &self.outcome {
            Outcome::Unresponsive(err) => Some(err),
            _ => None,
        }
    }

    pub fn handle_mut(&mut self) -> Option<&mut DriverHandle<B>> {
        match &mut self.outcome {
            Outcome::Ready(handle) => Some(handle),
            _ => None,
        }
    }
}

impl<B: I2c> fmt::Debug for DetectedDevice<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectedDevice")
            .field("address", &self.address)
            .field("tag", &self.tag)
            .field("outcome", &self.outcome)
            .finish()
    }
}

/// Maps addresses to drivers through the registry and starts them.
///
/// Every per-device failure is captured in the returned [`DetectedDevice`];
/// nothing here aborts the handling of other addresses.
#[derive(Debug, Clone, Default)]
pub struct DeviceDispatcher {
    registry: AddressRegistry,
    panel: PanelConfig,
}

impl DeviceDispatcher {
    pub fn new(registry: AddressRegistry, panel: PanelConfig) -> Self {
        Self { registry, panel }
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    pub fn resolve_and_initialize<B: I2c>(&self, bus: &mut B, address: BusAddress) -> DetectedDevice<B> {
        let candidates: Vec<DriverTag> = self
            .registry
            .candidates_for(address)
            .iter()
            .map(|d| d.driver)
            .collect();

        let selected = match candidates.as_slice() {
            [] => {
                info!("{}: no known driver", address);
                return DetectedDevice { address, tag: None, outcome: Outcome::Unclaimed };
            }
            [only] => *only,
            [first, ..] => match self.registry.probe_for(address) {
                Some(probe) => match drivers::read_register(bus, address, probe.register) {
                    Ok(value) => {
                        let tag = probe.select(value);
                        debug!(
                            "{}: register {:#04x} = {:#04x}, selecting {}",
                            address, probe.register, value, tag
                        );
                        tag
                    }
                    Err(err) => {
                        warn!("{}: disambiguation read failed: {}", address, err);
                        return DetectedDevice { address, tag: None, outcome: Outcome::Unresponsive(err) };
                    }
                },
                None => {
                    warn!("{}: shared by {:?} with no probe, using {}", address, candidates, first);
                    *first
                }
            },
        };

        let (tag, result) = match start(bus, address, selected, &self.panel) {
            Err(DriverError::IdentityMismatch { expected, found }) => {
                match self.registry.probe_for(address).and_then(|p| p.alternate(selected)) {
                    Some(alternate) => {
                        info!(
                            "{}: {} identity mismatch (expected {:#04x}, found {:#04x}), trying {}",
                            address, selected, expected, found, alternate
                        );
                        (alternate, start(bus, address, alternate, &self.panel))
                    }
                    None => (selected, Err(DriverError::IdentityMismatch { expected, found })),
                }
            }
            other => (selected, other),
        };

        let outcome = match result {
            Ok(handle) => {
                info!("{}: {} ({}) ready", address, tag, tag.describe());
                Outcome::Ready(handle)
            }
            Err(err) => {
                warn!("{}: {} did not start: {}", address, tag, err);
                Outcome::Unresponsive(err)
            }
        };
        DetectedDevice { address, tag: Some(tag), outcome }
    }

    /// One record per address, in the order given.
    pub fn dispatch_all<B: I2c>(&self, bus: &mut B, addresses: &[BusAddress]) -> Vec<DetectedDevice<B>> {
        addresses
            .iter()
            .map(|&address| self.resolve_and_initialize(bus, address))
            .collect()
    }
}

/// Scan the bus and dispatch every address that answered.
///
/// Only a bus-level fault during the scan itself is an error.
pub fn survey<B: I2c>(bus: &mut B, dispatcher: &DeviceDispatcher) -> Result<Vec<DetectedDevice<B>>, BusError> {
    let addresses = BusScanner::scan(bus)?;
    Ok(dispatcher.dispatch_all(bus, &addresses))
}

fn start<B: I2c>(
    bus: &mut B,
    address: BusAddress,
    tag: DriverTag,
    panel: &PanelConfig,
) -> Result<DriverHandle<B>, DriverError> {
    match tag {
        DriverTag::Aht20 => sensor::<Aht20, B>(bus, address),
        DriverTag::Bme280 => sensor::<Bme280, B>(bus, address),
        DriverTag::Bme680 => sensor::<Bme680, B>(bus, address),
        DriverTag::Bh1750 => sensor::<Bh1750, B>(bus, address),
        DriverTag::Sht3x => sensor::<Sht3x, B>(bus, address),
        DriverTag::Sgp30 => sensor::<Sgp30, B>(bus, address),
        DriverTag::Sgp40 => sensor::<Sgp40, B>(bus, address),
        DriverTag::Scd30 => sensor::<Scd30, B>(bus, address),
        DriverTag::Tsl2561 => sensor::<Tsl2561, B>(bus, address),
        DriverTag::Ds1307 => sensor::<Ds1307, B>(bus, address),
        DriverTag::Ssd1305 => {
            <Ssd1305 as DriverAdapter<B>>::initialize(bus, address, panel).map(DriverHandle::Display)
        }
    }
}

fn sensor<D, B>(bus: &mut B, address: BusAddress) -> Result<DriverHandle<B>, DriverError>
where
    B: I2c,
    D: DriverAdapter<B, Settings = ()> + SensorDriver<B> + 'static,
{
    let driver = D::initialize(bus, address, &())?;
    Ok(DriverHandle::Sensor(Box::new(driver)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{EmulatedBus, EmulatedDevice};
    use crate::drivers::bme::{BME280_CHIP_ID, BME680_CHIP_ID, REG_CHIP_ID};
    use crate::registry::{DeviceDescriptor, DisambiguationProbe};
    use embedded_hal::i2c::ErrorKind;

    fn a(raw: u8) -> BusAddress {
        BusAddress::new(raw).unwrap()
    }

    fn bme680() -> EmulatedDevice {
        EmulatedDevice::new()
            .with_register(REG_CHIP_ID, BME680_CHIP_ID)
            .with_registers(0xE9, &[0x90, 0x65])
            .with_registers(0x8A, &[0xA4, 0x66, 0x03])
    }

    fn bme280() -> EmulatedDevice {
        EmulatedDevice::new()
            .with_register(REG_CHIP_ID, BME280_CHIP_ID)
            .with_registers(0x88, &[0x70, 0x6B, 0x43, 0x67, 0x18, 0xFC])
    }

    #[test]
    fn test_unknown_address_is_unclaimed() {
        let mut bus = EmulatedBus::new().with_device(0x50, EmulatedDevice::new());
        let found = DeviceDispatcher::default().resolve_and_initialize(&mut bus, a(0x50));
        assert!(matches!(found.outcome, Outcome::Unclaimed));
        assert_eq!(found.tag, None);
        assert_eq!(bus.transactions(), 0);
    }

    #[test]
    fn test_single_candidate_always_selected() {
        let dispatcher = DeviceDispatcher::default();
        for descriptor in dispatcher.registry().descriptors() {
            for &address in &descriptor.addresses {
                if dispatcher.registry().candidates_for(address).len() != 1 {
                    continue;
                }
                // a device that acknowledges but never answers: the tag is
                // still the sole candidate even though it fails to start
                let mut bus = EmulatedBus::new()
                    .with_device(address.get(), EmulatedDevice::new().stalling(ErrorKind::Other));
                let found = dispatcher.resolve_and_initialize(&mut bus, address);
                assert_eq!(found.tag, Some(descriptor.driver), "at {}", address);
                assert!(found.error().unwrap().is_transport());
            }
        }
    }

    #[test]
    fn test_chip_id_selects_variant_at_both_addresses() {
        let dispatcher = DeviceDispatcher::default();
        for raw in [0x76, 0x77] {
            let mut bus = EmulatedBus::new().with_device(raw, bme680());
            let found = dispatcher.resolve_and_initialize(&mut bus, a(raw));
            assert_eq!(found.tag, Some(DriverTag::Bme680));
            assert!(found.is_ready());

            let mut bus = EmulatedBus::new().with_device(raw, bme280());
            let found = dispatcher.resolve_and_initialize(&mut bus, a(raw));
            assert_eq!(found.tag, Some(DriverTag::Bme280));
            assert!(found.is_ready());
        }
    }

    #[test]
    fn test_failed_probe_read_is_unresponsive() {
        let mut bus = EmulatedBus::new()
            .with_device(0x76, EmulatedDevice::new().stalling(ErrorKind::Other));
        let found = DeviceDispatcher::default().resolve_and_initialize(&mut bus, a(0x76));
        assert_eq!(found.tag, None);
        assert!(found.error().unwrap().is_transport());
    }

    #[test]
    fn test_identity_mismatch_falls_back_once() {
        // probe on a register that says nothing useful: always picks bme280
        let probe = DisambiguationProbe {
            register: 0x00,
            expected: 0xFF,
            on_match: DriverTag::Bme280,
            otherwise: DriverTag::Bme680,
        };
        let registry = AddressRegistry::from_descriptors(vec![
            DeviceDescriptor {
                family: "BME680".into(),
                driver: DriverTag::Bme680,
                addresses: vec![a(0x77)],
                probe: Some(probe),
            },
            DeviceDescriptor {
                family: "BME280".into(),
                driver: DriverTag::Bme280,
                addresses: vec![a(0x77)],
                probe: Some(probe),
            },
        ])
        .unwrap();
        let dispatcher = DeviceDispatcher::new(registry, PanelConfig::default());

        let mut bus = EmulatedBus::new().with_device(0x77, bme280());
        let found = dispatcher.resolve_and_initialize(&mut bus, a(0x77));
        assert_eq!(found.tag, Some(DriverTag::Bme280));
        assert!(found.is_ready());
    }

    #[test]
    fn test_identity_mismatch_on_both_variants_gives_up() {
        // a BMP280 (chip id 0x58) answers at a BME address
        let mut bus = EmulatedBus::new()
            .with_device(0x77, EmulatedDevice::new().with_register(REG_CHIP_ID, 0x58));
        let found = DeviceDispatcher::default().resolve_and_initialize(&mut bus, a(0x77));
        assert_eq!(found.tag, Some(DriverTag::Bme680));
        assert_eq!(
            found.error(),
            Some(&DriverError::IdentityMismatch { expected: 0x61, found: 0x58 })
        );
        // probe, first identity read, alternate identity read
        assert_eq!(bus.transactions(), 3);
    }

    #[test]
    fn test_transport_failure_is_not_retried() {
        let mut bus = EmulatedBus::new()
            .with_device(0x68, EmulatedDevice::new().stalling(ErrorKind::Other));
        let found = DeviceDispatcher::default().resolve_and_initialize(&mut bus, a(0x68));
        assert_eq!(found.tag, Some(DriverTag::Ds1307));
        assert!(matches!(found.outcome, Outcome::Unresponsive(DriverError::Bus(BusError::Other(_)))));
        assert_eq!(bus.transactions(), 1);
    }

    #[test]
    fn test_display_uses_configured_panel() {
        let panel = PanelConfig { width: 64, height: 48, external_vcc: true };
        let dispatcher = DeviceDispatcher::new(AddressRegistry::builtin(), panel);
        let mut bus = EmulatedBus::new().with_device(0x3D, EmulatedDevice::new());
        let mut found = dispatcher.resolve_and_initialize(&mut bus, a(0x3D));

        let display = found.handle_mut().and_then(|h| h.as_display()).unwrap();
        assert_eq!(display.panel(), &panel);
        assert_eq!(display.framebuffer().len(), 384);
    }

    #[test]
    fn test_dispatch_all_keeps_going_past_failures() {
        let mut bus = EmulatedBus::new()
            .with_device(0x3C, EmulatedDevice::new())
            .with_device(0x68, EmulatedDevice::new().stalling(ErrorKind::Other))
            .with_device(0x76, bme680());
        let found = DeviceDispatcher::default().dispatch_all(&mut bus, &[a(0x3C), a(0x68), a(0x76)]);
        assert_eq!(found.len(), 3);
        assert!(found[0].is_ready());
        assert!(!found[1].is_ready());
        assert!(found[2].is_ready());
    }

    #[test]
    fn test_survey_fails_only_on_wedged_bus() {
        let mut bus = EmulatedBus::new().with_device(0x38, EmulatedDevice::new());
        bus.wedge();
        let err = survey(&mut bus, &DeviceDispatcher::default()).unwrap_err();
        assert_eq!(err, BusError::Bus);
    }

    #[test]
    fn test_identity_mismatch_without_alternate_is_final() {
        // a foreign part at a light-sensor address has nothing to fall back to
        let mut bus = EmulatedBus::new()
            .with_device(0x39, EmulatedDevice::new().with_register(0x8A, 0x50));
        let found = DeviceDispatcher::default().resolve_and_initialize(&mut bus, a(0x39));
        assert_eq!(found.tag, Some(DriverTag::Tsl2561));
        assert_eq!(
            found.error(),
            Some(&DriverError::IdentityMismatch { expected: 0x10, found: 0x50 })
        );
        // power-up write, id read
        assert_eq!(bus.transactions(), 2);
    }
}
