//! Configuration file handling for ~/.pollution-map/config.ini.
//!
//! Every key is optional; a missing file means defaults. CLI flags are
//! applied on top by the binary.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use crate::error::ConfigError;
use crate::layers::registry::BIVARIATE_FEATURES;
use crate::switcher::{ActivationMode, SwitcherMode, SwitcherOptions};

pub const DEFAULT_CENTER_LON: f64 = 10.4;
pub const DEFAULT_CENTER_LAT: f64 = 51.1;
pub const DEFAULT_ZOOM: f64 = 5.0;
pub const DEFAULT_RESIZE_DELAY_MS: u64 = 100;
pub const DEFAULT_FALLBACK_DELAY_MS: u64 = 700;

/// `[view]`
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSettings {
    pub center_lon: f64,
    pub center_lat: f64,
    /// Web-map zoom level
    pub zoom: f64,
    /// Wait before the one-shot size refresh after start-up
    pub resize_delay: Duration,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            center_lon: DEFAULT_CENTER_LON,
            center_lat: DEFAULT_CENTER_LAT,
            zoom: DEFAULT_ZOOM,
            resize_delay: Duration::from_millis(DEFAULT_RESIZE_DELAY_MS),
        }
    }
}

/// `[data]`
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    /// Natural Earth outlines and relative feature paths resolve here
    pub data_dir: PathBuf,
    /// Path under `data_dir`, or an http(s) URL
    pub features: String,
    pub images_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            features: BIVARIATE_FEATURES.to_string(),
            images_dir: PathBuf::from("images"),
        }
    }
}

/// `[layers]`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSettings {
    pub land_cover_exclusive: bool,
}

/// `[switcher]`
#[derive(Debug, Clone, PartialEq)]
pub struct SwitcherSettings {
    pub mode: SwitcherMode,
    pub activation_mode: ActivationMode,
    pub fallback_delay: Duration,
    pub start_active: bool,
}

impl Default for SwitcherSettings {
    fn default() -> Self {
        Self {
            mode: SwitcherMode::Nested,
            activation_mode: ActivationMode::Click,
            fallback_delay: Duration::from_millis(DEFAULT_FALLBACK_DELAY_MS),
            start_active: false,
        }
    }
}

impl SwitcherSettings {
    pub fn options(&self) -> SwitcherOptions {
        SwitcherOptions {
            mode: self.mode,
            activation_mode: self.activation_mode,
            start_active: self.start_active,
            ..SwitcherOptions::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapConfig {
    pub view: ViewSettings,
    pub data: DataSettings,
    pub layers: LayerSettings,
    pub switcher: SwitcherSettings,
}

impl MapConfig {
    /// Load from the default path
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`, or defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }
}

/// Overlay the values in `ini` on the defaults
pub fn parse_ini(ini: &Ini) -> Result<MapConfig, ConfigError> {
    let mut config = MapConfig::default();

    if let Some(section) = ini.section(Some("view")) {
        let view = &mut config.view;
        if let Some(lon) = parse_value::<f64>(section, "view", "center_lon")? {
            view.center_lon = check_range("view", "center_lon", lon, -180.0, 180.0)?;
        }
        if let Some(lat) = parse_value::<f64>(section, "view", "center_lat")? {
            view.center_lat = check_range("view", "center_lat", lat, -85.0, 85.0)?;
        }
        if let Some(zoom) = parse_value::<f64>(section, "view", "zoom")? {
            view.zoom = check_range("view", "zoom", zoom, 0.0, 19.0)?;
        }
        if let Some(ms) = parse_value::<u64>(section, "view", "resize_delay_ms")? {
            view.resize_delay = Duration::from_millis(ms);
        }
    }

    if let Some(section) = ini.section(Some("data")) {
        if let Some(v) = non_empty(section, "data_dir") {
            config.data.data_dir = expand_tilde(v);
        }
        if let Some(v) = non_empty(section, "features") {
            config.data.features = v.to_string();
        }
        if let Some(v) = non_empty(section, "images_dir") {
            config.data.images_dir = expand_tilde(v);
        }
    }

    if let Some(section) = ini.section(Some("layers")) {
        if let Some(v) = parse_value::<bool>(section, "layers", "land_cover_exclusive")? {
            config.layers.land_cover_exclusive = v;
        }
    }

    if let Some(section) = ini.section(Some("switcher")) {
        if let Some(mode) = parse_value::<SwitcherMode>(section, "switcher", "mode")? {
            config.switcher.mode = mode;
        }
        if let Some(activation) = parse_value::<ActivationMode>(section, "switcher", "activation_mode")? {
            config.switcher.activation_mode = activation;
        }
        if let Some(ms) = parse_value::<u64>(section, "switcher", "fallback_delay_ms")? {
            config.switcher.fallback_delay = Duration::from_millis(ms);
        }
        if let Some(v) = parse_value::<bool>(section, "switcher", "start_active")? {
            config.switcher.start_active = v;
        }
    }

    Ok(config)
}

fn non_empty<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_value<T>(section: &Properties, name: &str, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = non_empty(section, key) else {
        return Ok(None);
    };
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| invalid(name, key, raw, e.to_string()))
}

fn check_range(section: &str, key: &str, value: f64, min: f64, max: f64) -> Result<f64, ConfigError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(invalid(
            section,
            key,
            &value.to_string(),
            format!("must be between {min} and {max}"),
        ))
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}

/// Get the path to the config directory (~/.pollution-map).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pollution-map")
}

/// Get the path to the config file (~/.pollution-map/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<MapConfig, ConfigError> {
        parse_ini(&Ini::load_from_str(text).unwrap())
    }

    #[test]
    fn test_default_config() {
        let config = MapConfig::default();
        assert_eq!(config.view.center_lon, 10.4);
        assert_eq!(config.view.center_lat, 51.1);
        assert_eq!(config.view.zoom, 5.0);
        assert_eq!(config.view.resize_delay, Duration::from_millis(100));
        assert_eq!(config.data.features, BIVARIATE_FEATURES);
        assert!(!config.layers.land_cover_exclusive);
        assert_eq!(config.switcher.fallback_delay, Duration::from_millis(700));
        assert_eq!(config.switcher.mode, SwitcherMode::Nested);
        assert_eq!(config.switcher.activation_mode, ActivationMode::Click);
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = MapConfig::load_from(&temp_dir.path().join("missing.ini")).unwrap();
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[view]\nzoom = 6.5\nresize_delay_ms = 250\n\n\
             [data]\nfeatures = https://example.org/no2.geojson\n\n\
             [layers]\nland_cover_exclusive = true\n\n\
             [switcher]\nmode = flat\nactivation_mode = mouseover\n\
             fallback_delay_ms = 500\nstart_active = true\n",
        )
        .unwrap();

        let config = MapConfig::load_from(&path).unwrap();
        assert_eq!(config.view.zoom, 6.5);
        assert_eq!(config.view.resize_delay, Duration::from_millis(250));
        assert_eq!(config.data.features, "https://example.org/no2.geojson");
        assert!(config.layers.land_cover_exclusive);
        assert_eq!(config.switcher.mode, SwitcherMode::Flat);
        assert_eq!(config.switcher.fallback_delay, Duration::from_millis(500));
        assert!(config.switcher.options().start_active);
        assert_eq!(
            config.switcher.options().activation_mode,
            ActivationMode::MouseOver
        );
        assert_eq!(config.switcher.options().tip_label, "Legenda");
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = parse("[data]\ndata_dir =\n[view]\nzoom = \n").unwrap();
        assert_eq!(config, MapConfig::default());
    }

    #[test]
    fn test_invalid_values_name_the_key() {
        match parse("[switcher]\nmode = sideways\n") {
            Err(ConfigError::InvalidValue { section, key, value, .. }) => {
                assert_eq!(section, "switcher");
                assert_eq!(key, "mode");
                assert_eq!(value, "sideways");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
        assert!(matches!(
            parse("[view]\ncenter_lat = 91\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            parse("[layers]\nland_cover_exclusive = maybe\n"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_config_path_location() {
        let path = config_file_path();
        assert!(path.ends_with(".pollution-map/config.ini"));
    }
}
