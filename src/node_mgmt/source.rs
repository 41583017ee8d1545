use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use crate::constants::defaults;
use crate::node_mgmt::config::{
    box_sites_from_str, power_meters_from_str, BoxDeviceConfig, ConfigError, DeviceConfigSet,
    PowerMeterDeviceConfig,
};

/// Provides the device lists for one collection cycle
///
/// Implementations are asked again at the start of every cycle, so a changed
/// configuration takes effect between cycles without a restart. Each family
/// loads on its own: a broken power meter document never stops box collection.
pub trait ConfigSource: Send + Sync {
    fn load_boxes(&self) -> Result<Vec<BoxDeviceConfig>, ConfigError>;

    fn load_power_meters(&self) -> Result<Vec<PowerMeterDeviceConfig>, ConfigError>;

    /// Both families; fails if either one does
    fn load(&self) -> Result<DeviceConfigSet, ConfigError> {
        Ok(DeviceConfigSet {
            power_meters: self.load_power_meters()?,
            boxes: self.load_boxes()?,
        })
    }
}

/// Reads `box_ips.json` and `power_meter_config.json` from a directory
pub struct FileConfigSource {
    dir: PathBuf,
}

impl FileConfigSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

fn read(path: PathBuf) -> Result<String, ConfigError> {
    fs::read_to_string(&path).map_err(|source| ConfigError::Read { path, source })
}

impl ConfigSource for FileConfigSource {
    fn load_boxes(&self) -> Result<Vec<BoxDeviceConfig>, ConfigError> {
        let file = box_sites_from_str(&read(self.dir.join(defaults::BOX_CONFIG_FILE))?)?;
        DeviceConfigSet::boxes_from_file(file)
    }

    fn load_power_meters(&self) -> Result<Vec<PowerMeterDeviceConfig>, ConfigError> {
        let file =
            power_meters_from_str(&read(self.dir.join(defaults::POWER_METER_CONFIG_FILE))?)?;
        DeviceConfigSet::power_meters_from_file(file)
    }
}

/// In-memory configuration that can be swapped while services run
#[derive(Default)]
pub struct StaticConfigSource {
    config: RwLock<DeviceConfigSet>,
}

impl StaticConfigSource {
    pub fn new(config: DeviceConfigSet) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    pub fn replace(&self, config: DeviceConfigSet) {
        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
    }
}

impl StaticConfigSource {
    fn current(&self) -> DeviceConfigSet {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl ConfigSource for StaticConfigSource {
    fn load_boxes(&self) -> Result<Vec<BoxDeviceConfig>, ConfigError> {
        Ok(self.current().boxes)
    }

    fn load_power_meters(&self) -> Result<Vec<PowerMeterDeviceConfig>, ConfigError> {
        Ok(self.current().power_meters)
    }

    fn load(&self) -> Result<DeviceConfigSet, ConfigError> {
        Ok(self.current())
    }
}
