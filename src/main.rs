/*
 *  main.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Entry point - scan, start drivers, report
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

use anyhow::{Context, Result};
use embedded_hal::i2c::I2c;
use env_logger::Env;
use linux_embedded_hal::I2cdev;
use log::{debug, info, warn};

use i2cscout::config::{self, Config};
use i2cscout::report;
use i2cscout::{survey, DeviceDispatcher, DriverHandle, EmulatedBus};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

fn main() -> Result<()> {
    let (cfg, dump_config) = config::load()?;

    if dump_config {
        // Pretty YAML of effective config
        println!("{}", serde_yaml::to_string(&cfg)?);
        return Ok(());
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(cfg.log_level()))
        .format_timestamp_secs()
        .init();

    info!("This is {} - find what's on the wire", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let dispatcher = DeviceDispatcher::new(cfg.registry()?, cfg.panel());
    debug!(
        "Registry claims {} address(es)",
        dispatcher.registry().addresses().count()
    );

    if cfg.is_emulated() {
        info!("Emulation mode enabled - surveying the demo bench");
        let mut bus = EmulatedBus::demo();
        run(&mut bus, &dispatcher, &cfg)
    } else {
        let path = cfg.bus_path();
        info!("Opening i2c bus {}", path);
        let mut bus = I2cdev::new(path).with_context(|| format!("Failed to open {}", path))?;
        run(&mut bus, &dispatcher, &cfg)
    }
}

fn run<B: I2c>(bus: &mut B, dispatcher: &DeviceDispatcher, cfg: &Config) -> Result<()> {
    println!("Scan i2c bus...");
    let mut devices = survey(bus, dispatcher).context("i2c bus scan failed")?;
    println!("i2c devices found: {}", devices.len());

    for device in devices.iter_mut() {
        let reading = device.handle_mut().and_then(|handle| handle.read(bus));
        println!("{}", report::summary_line(device, reading.as_ref()));
    }

    let lines = report::panel_lines(&devices);
    let display = devices
        .iter_mut()
        .find_map(|d| d.handle_mut().and_then(DriverHandle::as_display));

    if let Some(display) = display {
        let Ok(()) = report::draw_summary(display, &lines);
        let shown = cfg
            .contrast()
            .map_or(Ok(()), |level| display.contrast(bus, level))
            .and_then(|_| display.invert(bus, cfg.invert()))
            .and_then(|_| display.show(bus));
        if let Err(e) = shown {
            warn!("Unable to update panel at {}: {}", display.address(), e);
        }
    }
    Ok(())
}
