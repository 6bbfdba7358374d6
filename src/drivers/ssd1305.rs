/*
 *  drivers/ssd1305.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  SSD1305 OLED display driver - register program, addressing window, framebuffer
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

use embedded_graphics::geometry::Size;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_hal::i2c::I2c;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bus::BusAddress;
use crate::drivers::{self, DriverAdapter, DriverError};

/// Control byte prefixes: Co=1 D/C#=0 for a single command, Co=0 D/C#=1 for a data stream.
pub const CONTROL_COMMAND: u8 = 0x80;
pub const CONTROL_DATA: u8 = 0x40;

/// Display RAM is 132 columns wide.
pub const MAX_COLUMNS: u32 = 132;

pub mod cmd {
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_ENTIRE_ON: u8 = 0xA4;
    pub const SET_NORM_INV: u8 = 0xA6;
    pub const SET_DISP: u8 = 0xAE;
    pub const SET_MEM_ADDR: u8 = 0x20;
    pub const SET_COL_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
    pub const DEACTIVATE_SCROLL: u8 = 0x2E;
    pub const SET_DISP_START_LINE: u8 = 0x40;
    pub const SET_LUT: u8 = 0x91;
    pub const SET_SEG_REMAP: u8 = 0xA0;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_MASTER_CONFIG: u8 = 0xAD;
    pub const SET_COMSCAN_DEC: u8 = 0xC8;
    pub const SET_DISP_OFFSET: u8 = 0xD3;
    pub const SET_COM_PIN_CFG: u8 = 0xDA;
    pub const SET_DISP_CLK_DIV: u8 = 0xD5;
    pub const SET_AREA_COLOR: u8 = 0xD8;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_VCOM_DESEL: u8 = 0xDB;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// Panel geometry and supply wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub width: u32,
    pub height: u32,
    pub external_vcc: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self { width: 128, height: 32, external_vcc: false }
    }
}

impl PanelConfig {
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.height == 0 || self.height % 8 != 0 || self.height > 64 {
            return Err(DriverError::InvalidConfiguration(format!(
                "panel height {} must be a multiple of 8 in 8..=64",
                self.height
            )));
        }
        let (_, last) = self.column_window();
        if self.width == 0 || u32::from(last) + u32::from(self.column_offset()) >= MAX_COLUMNS {
            return Err(DriverError::InvalidConfiguration(format!(
                "panel width {} does not fit the {} column display RAM",
                self.width, MAX_COLUMNS
            )));
        }
        Ok(())
    }

    pub fn page_count(&self) -> u32 {
        self.height / 8
    }

    /// Wiring correction on 32-row panels.
    pub fn column_offset(&self) -> u8 {
        if self.height == 32 { 4 } else { 0 }
    }

    /// First and last column before the offset; 64-wide panels sit 32 columns in.
    pub fn column_window(&self) -> (u8, u8) {
        let shift = if self.width == 64 { 32 } else { 0 };
        let last = self.width.saturating_sub(1) + shift;
        (shift as u8, last.min(u32::from(u8::MAX)) as u8)
    }

    /// Framebuffer payload size, excluding the control byte.
    pub fn buffer_len(&self) -> usize {
        (self.page_count() * self.width) as usize
    }
}

/// The full power-up register program, one byte per command write.
#[rustfmt::skip]
pub fn init_sequence(panel: &PanelConfig) -> Vec<u8> {
    use cmd::*;
    vec![
        SET_DISP,                          // off
        SET_DISP_CLK_DIV, 0x80,
        SET_SEG_REMAP | 0x01,              // column 127 mapped to SEG0
        SET_MUX_RATIO, (panel.height - 1) as u8,
        SET_DISP_OFFSET, 0x00,
        SET_MASTER_CONFIG, 0x8E,
        SET_AREA_COLOR, 0x05,              // low power display mode
        SET_MEM_ADDR, 0x00,                // horizontal
        SET_DISP_START_LINE,
        DEACTIVATE_SCROLL,
        SET_COMSCAN_DEC,
        SET_COM_PIN_CFG, 0x12,
        SET_LUT, 0x3F, 0x3F, 0x3F, 0x3F,   // pulse width bank 0, colours A, B, C
        SET_CONTRAST, 0xFF,
        SET_PRECHARGE, 0xD2,
        SET_VCOM_DESEL, 0x34,              // 0.83 x Vcc
        SET_NORM_INV,
        SET_ENTIRE_ON,                     // output follows RAM
        SET_CHARGE_PUMP, if panel.external_vcc { 0x10 } else { 0x14 },
        SET_DISP | 0x01,
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    Off,
    Initializing,
    On,
}

/// SSD1305 controller on a two-wire link.
///
/// The driver owns its framebuffer and power state; the bus is lent to each
/// operation. `buffer[0]` is the data-stream control byte, so the whole
/// vector goes out in one write.
#[derive(Debug, Clone)]
pub struct Ssd1305 {
    address: BusAddress,
    panel: PanelConfig,
    column_offset: u8,
    state: PowerState,
    buffer: Vec<u8>,
}

impl Ssd1305 {
    /// Build an uninitialized driver; nothing is sent to the panel yet.
    pub fn new(address: BusAddress, panel: PanelConfig) -> Result<Self, DriverError> {
        panel.validate()?;
        let mut buffer = vec![0u8; panel.buffer_len() + 1];
        buffer[0] = CONTROL_DATA;
        Ok(Self {
            address,
            panel,
            column_offset: panel.column_offset(),
            state: PowerState::Off,
            buffer,
        })
    }

    /// Run the register program, clear the panel and switch it on.
    pub fn init<B: I2c>(&mut self, bus: &mut B) -> Result<(), DriverError> {
        self.state = PowerState::Initializing;
        for byte in init_sequence(&self.panel) {
            self.write_command(bus, byte)?;
        }
        self.fill(false);
        self.show(bus)?;
        self.state = PowerState::On;
        info!(
            "SSD1305 at {} initialized ({}x{}, column offset {})",
            self.address, self.panel.width, self.panel.height, self.column_offset
        );
        Ok(())
    }

    pub fn address(&self) -> BusAddress {
        self.address
    }

    pub fn panel(&self) -> &PanelConfig {
        &self.panel
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    pub fn column_offset(&self) -> u8 {
        self.column_offset
    }

    /// Pixel payload without the control byte.
    pub fn framebuffer(&self) -> &[u8] {
        &self.buffer[1..]
    }

    pub fn fill(&mut self, on: bool) {
        self.buffer[1..].fill(if on { 0xFF } else { 0x00 });
    }

    fn index(&self, x: u32, y: u32) -> Option<(usize, u8)> {
        if x >= self.panel.width || y >= self.panel.height {
            return None;
        }
        let byte = 1 + ((y / 8) * self.panel.width + x) as usize;
        Some((byte, 1 << (y % 8)))
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if let Some((byte, mask)) = self.index(x, y) {
            if on {
                self.buffer[byte] |= mask;
            } else {
                self.buffer[byte] &= !mask;
            }
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> bool {
        self.index(x, y)
            .map(|(byte, mask)| self.buffer[byte] & mask != 0)
            .unwrap_or(false)
    }

    fn write_command<B: I2c>(&self, bus: &mut B, byte: u8) -> Result<(), DriverError> {
        drivers::write(bus, self.address, &[CONTROL_COMMAND, byte])
    }

    /// Push the whole framebuffer to display RAM.
    pub fn show<B: I2c>(&mut self, bus: &mut B) -> Result<(), DriverError> {
        let (x0, x1) = self.panel.column_window();
        let last_page = (self.panel.page_count() - 1) as u8;

        for byte in [
            cmd::SET_COL_ADDR,
            x0 + self.column_offset,
            x1 + self.column_offset,
            cmd::SET_PAGE_ADDR,
            0,
            last_page,
        ] {
            self.write_command(bus, byte)?;
        }
        debug!("SSD1305 at {} flushing {} bytes", self.address, self.buffer.len() - 1);
        drivers::write(bus, self.address, &self.buffer)
    }

    pub fn poweroff<B: I2c>(&mut self, bus: &mut B) -> Result<(), DriverError> {
        self.write_command(bus, cmd::SET_DISP)?;
        self.state = PowerState::Off;
        Ok(())
    }

    /// Turn the panel back on without re-running the register program.
    pub fn poweron<B: I2c>(&mut self, bus: &mut B) -> Result<(), DriverError> {
        if self.state == PowerState::On {
            return Ok(());
        }
        self.write_command(bus, cmd::SET_DISP | 0x01)?;
        self.state = PowerState::On;
        Ok(())
    }

    pub fn contrast<B: I2c>(&mut self, bus: &mut B, level: u8) -> Result<(), DriverError> {
        self.write_command(bus, cmd::SET_CONTRAST)?;
        self.write_command(bus, level)
    }

    pub fn invert<B: I2c>(&mut self, bus: &mut B, invert: bool) -> Result<(), DriverError> {
        self.write_command(bus, cmd::SET_NORM_INV | u8::from(invert))
    }
}

impl<B: I2c> DriverAdapter<B> for Ssd1305 {
    type Settings = PanelConfig;

    fn initialize(bus: &mut B, address: BusAddress, panel: &PanelConfig) -> Result<Self, DriverError> {
        let mut display = Ssd1305::new(address, *panel)?;
        display.init(bus)?;
        Ok(display)
    }
}

impl DrawTarget for Ssd1305 {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            if p.x >= 0 && p.y >= 0 {
                self.set_pixel(p.x as u32, p.y as u32, color.is_on());
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color.is_on());
        Ok(())
    }
}

impl OriginDimensions for Ssd1305 {
    fn size(&self) -> Size {
        Size::new(self.panel.width, self.panel.height)
    }
}
