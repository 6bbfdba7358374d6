/*
 *  drivers/readings.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Sparse measurement record
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

use chrono::NaiveDateTime;

/// Whatever a sensor family measures; fields a family doesn't support stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    pub temperature_c: Option<f32>,
    pub humidity_pct: Option<f32>,
    pub pressure_hpa: Option<f32>,
    pub gas_resistance_ohm: Option<f32>,
    pub co2_ppm: Option<f32>,
    pub tvoc_ppb: Option<u16>,
    pub raw_index: Option<u32>,
    pub illuminance_lux: Option<f32>,
    pub clock: Option<NaiveDateTime>,
}

impl Readings {
    pub fn is_empty(&self) -> bool {
        *self == Readings::default()
    }
}

impl fmt::Display for Readings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(t) = self.temperature_c { parts.push(format!("{:.1} °C", t)); }
        if let Some(h) = self.humidity_pct { parts.push(format!("{:.1} %RH", h)); }
        if let Some(p) = self.pressure_hpa { parts.push(format!("{:.1} hPa", p)); }
        if let Some(g) = self.gas_resistance_ohm { parts.push(format!("{:.0} Ω", g)); }
        if let Some(c) = self.co2_ppm { parts.push(format!("{:.0} ppm CO2", c)); }
        if let Some(v) = self.tvoc_ppb { parts.push(format!("{} ppb TVOC", v)); }
        if let Some(r) = self.raw_index { parts.push(format!("raw {}", r)); }
        if let Some(l) = self.illuminance_lux { parts.push(format!("{:.1} lx", l)); }
        if let Some(c) = self.clock { parts.push(c.format("%Y-%m-%d %H:%M:%S").to_string()); }

        if parts.is_empty() {
            write!(f, "no data")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}
