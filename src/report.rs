/*
 *  report.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Human readable survey output, on the console and on the panel
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

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use embedded_hal::i2c::I2c;

use crate::dispatch::{DetectedDevice, Outcome};
use crate::drivers::{DriverError, Readings};

const LINE_HEIGHT: i32 = 10;

/// One console line for a dispatched device.
///
/// `reading` is the result of a measurement taken after start-up, if any.
pub fn summary_line<B: I2c>(
    device: &DetectedDevice<B>,
    reading: Option<&Result<Readings, DriverError>>,
) -> String {
    let name = device.tag.map(|t| t.name()).unwrap_or("?");
    match (&device.outcome, reading) {
        (Outcome::Unclaimed, _) => format!("{}  unknown device", device.address),
        (Outcome::Unresponsive(err), _) => {
            format!("{}  {:<8} not responding: {}", device.address, name, err)
        }
        (Outcome::Ready(_), Some(Ok(readings))) => {
            format!("{}  {:<8} {}", device.address, name, readings)
        }
        (Outcome::Ready(_), Some(Err(err))) => {
            format!("{}  {:<8} read failed: {}", device.address, name, err)
        }
        (Outcome::Ready(_), None) => match device.tag {
            Some(tag) => format!("{}  {:<8} {} ready", device.address, name, tag.describe()),
            None => format!("{}  ready", device.address),
        },
    }
}

/// Short per-device text for the panel: "0x38 aht20", "0x68 --".
pub fn panel_lines<B: I2c>(devices: &[DetectedDevice<B>]) -> Vec<String> {
    devices
        .iter()
        .map(|d| match (&d.outcome, d.tag) {
            (Outcome::Ready(_), Some(tag)) => format!("{} {}", d.address, tag),
            (Outcome::Unclaimed, _) => format!("{} ?", d.address),
            _ => format!("{} --", d.address),
        })
        .collect()
}

/// Lay the lines out top to bottom, two columns when they do not fit one.
pub fn draw_summary<D>(target: &mut D, lines: &[String]) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor> + OriginDimensions,
{
    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
    let size = target.size();
    let rows = (size.height as i32 / LINE_HEIGHT).max(1);
    let column_width = size.width as i32 / 2;

    target.clear(BinaryColor::Off)?;
    for (i, line) in lines.iter().enumerate() {
        let i = i as i32;
        let column = i / rows;
        if column > 1 {
            break;
        }
        let origin = Point::new(column * column_width, (i % rows) * LINE_HEIGHT);
        Text::with_baseline(line, origin, style, Baseline::Top).draw(target)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusAddress, EmulatedBus, EmulatedDevice};
    use crate::dispatch::DeviceDispatcher;
    use crate::drivers::{PanelConfig, Ssd1305};
    use embedded_hal::i2c::ErrorKind;

    fn a(raw: u8) -> BusAddress {
        BusAddress::new(raw).unwrap()
    }

    fn bench() -> (EmulatedBus, Vec<DetectedDevice<EmulatedBus>>) {
        let mut bus = EmulatedBus::new()
            .with_device(0x3C, EmulatedDevice::new())
            .with_device(0x50, EmulatedDevice::new())
            .with_device(0x68, EmulatedDevice::new().stalling(ErrorKind::Other));
        let found = DeviceDispatcher::default().dispatch_all(&mut bus, &[a(0x3C), a(0x50), a(0x68)]);
        (bus, found)
    }

    #[test]
    fn test_summary_lines() {
        let (_, found) = bench();
        assert_eq!(summary_line(&found[0], None), "0x3c  ssd1305  OLED display ready");
        assert_eq!(summary_line(&found[1], None), "0x50  unknown device");
        assert!(summary_line(&found[2], None).starts_with("0x68  ds1307   not responding"));

        let readings = Readings { temperature_c: Some(21.5), ..Default::default() };
        let line = summary_line(&found[0], Some(&Ok(readings.clone())));
        assert_eq!(line, format!("0x3c  ssd1305  {}", readings));
    }

    #[test]
    fn test_panel_lines() {
        let (_, found) = bench();
        assert_eq!(panel_lines(&found), vec!["0x3c ssd1305", "0x50 ?", "0x68 --"]);
    }

    #[test]
    fn test_draw_summary_marks_pixels() {
        let mut display = Ssd1305::new(a(0x3C), PanelConfig::default()).unwrap();
        display.fill(true);
        draw_summary(&mut display, &["0x38 aht20".to_string()]).unwrap();
        // cleared, then text drawn only in the first row band
        assert!(display.framebuffer().iter().any(|&b| b != 0));
        assert!(display.framebuffer()[2 * 128..].iter().all(|&b| b == 0));
    }
}
