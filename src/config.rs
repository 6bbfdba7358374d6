/*
 *  config.rs
 *
 *  i2cscout - find what's on the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Configuration - YAML file layered under command line overrides
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

use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::drivers::PanelConfig;
use crate::registry::{AddressRegistry, DeviceDescriptor, RegistryError};

pub const DEFAULT_BUS: &str = "/dev/i2c-1";

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Top-level configuration. Every field is optional so files and flags layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// i2c character device, e.g. /dev/i2c-1
    pub bus: Option<String>,
    /// run against the built-in emulated bench instead of hardware
    pub emulated: Option<bool>,
    pub display: Option<DisplayConfig>,
    /// replaces the built-in address table when present
    pub registry: Option<Vec<DeviceDescriptor>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DisplayConfig {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub external_vcc: Option<bool>,
    pub contrast: Option<u8>,       // 0-255
    pub invert: Option<bool>,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "i2cscout", version, about = "Find and start the devices on an i2c bus")]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// shorthand for --log-level debug
    #[arg(long, action = ArgAction::SetTrue)]
    pub debug: bool,
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub bus: Option<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub emulated: bool,
    #[arg(long)]
    pub display_width: Option<u32>,
    #[arg(long)]
    pub display_height: Option<u32>,
    #[arg(long, action = ArgAction::Set)]
    pub external_vcc: Option<bool>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

impl Config {
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn bus_path(&self) -> &str {
        self.bus.as_deref().unwrap_or(DEFAULT_BUS)
    }

    pub fn is_emulated(&self) -> bool {
        self.emulated.unwrap_or(false)
    }

    /// Panel geometry with defaults filled in.
    pub fn panel(&self) -> PanelConfig {
        let defaults = PanelConfig::default();
        match self.display.as_ref() {
            Some(d) => PanelConfig {
                width: d.width.unwrap_or(defaults.width),
                height: d.height.unwrap_or(defaults.height),
                external_vcc: d.external_vcc.unwrap_or(defaults.external_vcc),
            },
            None => defaults,
        }
    }

    pub fn contrast(&self) -> Option<u8> {
        self.display.as_ref().and_then(|d| d.contrast)
    }

    pub fn invert(&self) -> bool {
        self.display.as_ref().and_then(|d| d.invert).unwrap_or(false)
    }

    /// The configured table, or the built-in one.
    pub fn registry(&self) -> Result<AddressRegistry, ConfigError> {
        match self.registry.as_ref() {
            Some(descriptors) => Ok(AddressRegistry::from_descriptors(descriptors.clone())?),
            None => Ok(AddressRegistry::builtin()),
        }
    }
}

/// Public entry point: parse CLI, read YAML, merge, validate.
///
/// Returns the effective config and whether the caller asked for a dump.
pub fn load() -> Result<(Config, bool), ConfigError> {
    let cli = Cli::parse();
    let cfg = resolve(&cli)?;
    Ok((cfg, cli.dump_config))
}

/// Layer defaults < YAML < CLI and validate the result.
pub fn resolve(cli: &Cli) -> Result<Config, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/i2cscout/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/i2cscout/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/i2cscout.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["i2cscout.yaml", "config/i2cscout.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    parse_yaml(&s)
}

pub fn parse_yaml(s: &str) -> Result<Config, ConfigError> {
    let cfg: Config = serde_yaml::from_str(s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()      { dst.log_level = src.log_level; }
    if src.bus.is_some()            { dst.bus = src.bus; }
    if src.emulated.is_some()       { dst.emulated = src.emulated; }
    if src.registry.is_some()       { dst.registry = src.registry; }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.width.is_some()          { dst.width = src.width; }
    if src.height.is_some()         { dst.height = src.height; }
    if src.external_vcc.is_some()   { dst.external_vcc = src.external_vcc; }
    if src.contrast.is_some()       { dst.contrast = src.contrast; }
    if src.invert.is_some()         { dst.invert = src.invert; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()      { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                    { cfg.log_level = Some("debug".into()); }
    if cli.bus.is_some()            { cfg.bus = cli.bus.clone(); }
    if cli.emulated                 { cfg.emulated = Some(true); }

    let any_display = cli.display_width.is_some()
        || cli.display_height.is_some()
        || cli.external_vcc.is_some();

    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.display_width.is_some()  { display.width = cli.display_width; }
        if cli.display_height.is_some() { display.height = cli.display_height; }
        if cli.external_vcc.is_some()   { display.external_vcc = cli.external_vcc; }
    }
}

/// Geometry and the address table are checked here rather than at first use.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(level) = cfg.log_level.as_deref() {
        if level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Validation(format!("unknown log level '{level}'")));
        }
    }
    cfg.panel()
        .validate()
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    cfg.registry()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusAddress;
    use crate::registry::DriverTag;

    fn cli() -> Cli {
        Cli::default()
    }

    // resolve() without the file search, so tests never pick up a stray config
    fn resolve_from(yaml: &str, cli: &Cli) -> Result<Config, ConfigError> {
        let mut cfg = Config::default();
        merge(&mut cfg, parse_yaml(yaml)?);
        apply_cli_overrides(&mut cfg, cli);
        validate(&cfg)?;
        Ok(cfg)
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.log_level(), "info");
        assert_eq!(cfg.bus_path(), "/dev/i2c-1");
        assert!(!cfg.is_emulated());
        assert_eq!(cfg.panel(), PanelConfig { width: 128, height: 32, external_vcc: false });
        assert_eq!(cfg.registry().unwrap().descriptors().len(), 11);
    }

    #[test]
    fn test_yaml_fields() {
        let cfg = resolve_from(
            "log_level: warn\nbus: /dev/i2c-3\ndisplay:\n  width: 64\n  height: 48\n  contrast: 128\n",
            &cli(),
        )
        .unwrap();
        assert_eq!(cfg.log_level(), "warn");
        assert_eq!(cfg.bus_path(), "/dev/i2c-3");
        assert_eq!(cfg.panel().page_count(), 6);
        assert_eq!(cfg.contrast(), Some(128));
        assert!(!cfg.invert());
    }

    #[test]
    fn test_cli_wins_over_yaml() {
        let overrides = Cli {
            debug: true,
            display_height: Some(64),
            external_vcc: Some(true),
            emulated: true,
            ..Cli::default()
        };
        let cfg = resolve_from("log_level: warn\ndisplay:\n  height: 32\n", &overrides).unwrap();
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.panel().height, 64);
        assert!(cfg.panel().external_vcc);
        assert!(cfg.is_emulated());
    }

    #[test]
    fn test_bad_geometry_rejected() {
        let err = resolve_from("display:\n  height: 30\n", &cli()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_bad_log_level_rejected() {
        assert!(resolve_from("log_level: chatty\n", &cli()).is_err());
    }

    #[test]
    fn test_registry_override() {
        let yaml = r#"
registry:
  - family: Panel
    driver: ssd1305
    addresses: [0x3C]
  - family: RTC
    driver: ds1307
    addresses: [0x68]
"#;
        let cfg = resolve_from(yaml, &cli()).unwrap();
        let registry = cfg.registry().unwrap();
        assert_eq!(registry.descriptors().len(), 2);
        let addr = BusAddress::new(0x68).unwrap();
        assert_eq!(registry.candidates_for(addr)[0].driver, DriverTag::Ds1307);
        assert!(registry.candidates_for(BusAddress::new(0x3D).unwrap()).is_empty());
    }

    #[test]
    fn test_ambiguous_registry_rejected() {
        let yaml = r#"
registry:
  - family: A
    driver: aht20
    addresses: [0x38]
  - family: B
    driver: sht3x
    addresses: [0x38]
"#;
        let err = resolve_from(yaml, &cli()).unwrap_err();
        assert!(matches!(err, ConfigError::Registry(RegistryError::Ambiguous { .. })));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut cfg = parse_yaml("bus: /dev/i2c-0\ndisplay:\n  width: 96\n").unwrap();
        merge(&mut cfg, parse_yaml("display:\n  invert: true\n").unwrap());
        assert_eq!(cfg.bus_path(), "/dev/i2c-0");
        assert_eq!(cfg.panel().width, 96);
        assert!(cfg.invert());
    }

    #[test]
    fn test_dump_round_trip() {
        let cfg = resolve_from("emulated: true\ndisplay:\n  width: 128\n", &cli()).unwrap();
        let dumped = serde_yaml::to_string(&cfg).unwrap();
        assert_eq!(parse_yaml(&dumped).unwrap(), cfg);
    }
}
