//! Device configuration
//!
//! The on-disk documents (`box_ips.json`, `power_meter_config.json`) are parsed
//! into file structs first and then resolved into the per-device configs the
//! readers consume.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_mgmt::process::EnergyEncoding;
use crate::readers::modbus_rtu_tcp::{defaults, EndpointKey};
use crate::readers::protocol::{EnergyProfile, DEFAULT_ENERGY_REGISTER};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("could not read config file {}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid value {value:?} for environment variable {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("invalid device configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoxKind {
    Heatpump,
    Groundpipe,
}

impl BoxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxKind::Heatpump => "heatpump",
            BoxKind::Groundpipe => "groundpipe",
        }
    }
}

impl fmt::Display for BoxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_port() -> u16 {
    defaults::PORT
}

fn default_enabled() -> bool {
    true
}

fn default_temp1() -> u8 {
    defaults::TEMP1_SLAVE_ID
}

fn default_temp2() -> u8 {
    defaults::TEMP2_SLAVE_ID
}

fn default_flow() -> u8 {
    defaults::FLOW_SLAVE_ID
}

fn default_energy_register() -> u16 {
    DEFAULT_ENERGY_REGISTER
}

/// `box_ips.json`
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BoxSiteFile {
    #[serde(default)]
    pub heatpump: Vec<BoxEntry>,
    #[serde(default)]
    pub groundpipe: Vec<BoxEntry>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BoxEntry {
    pub device_id: String,
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub sensors: SensorSlaveIds,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct SensorSlaveIds {
    #[serde(default = "default_temp1")]
    pub temp1_slave_id: u8,
    #[serde(default = "default_temp2")]
    pub temp2_slave_id: u8,
    #[serde(default = "default_flow")]
    pub flow_slave_id: u8,
}

impl Default for SensorSlaveIds {
    fn default() -> Self {
        Self {
            temp1_slave_id: defaults::TEMP1_SLAVE_ID,
            temp2_slave_id: defaults::TEMP2_SLAVE_ID,
            flow_slave_id: defaults::FLOW_SLAVE_ID,
        }
    }
}

/// `power_meter_config.json`
///
/// All meters of a site hang off one RS-485 gateway. `energy_encoding` has no
/// default: it must be declared for the site and may be overridden per meter.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PowerMeterFile {
    pub ip: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub energy_encoding: EnergyEncoding,
    #[serde(default = "default_energy_register")]
    pub energy_register: u16,
    #[serde(default)]
    pub meters: Vec<MeterEntry>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MeterEntry {
    pub device_id: String,
    #[serde(default)]
    pub name: String,
    pub slave_id: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub energy_encoding: Option<EnergyEncoding>,
}

/// Slave ids for the three sensor roles of a box
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxSubAddresses {
    pub temp1: u8,
    pub temp2: u8,
    pub flow: u8,
}

impl From<SensorSlaveIds> for BoxSubAddresses {
    fn from(ids: SensorSlaveIds) -> Self {
        Self {
            temp1: ids.temp1_slave_id,
            temp2: ids.temp2_slave_id,
            flow: ids.flow_slave_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoxDeviceConfig {
    pub device_id: String,
    pub kind: BoxKind,
    pub endpoint: EndpointKey,
    pub sub_addresses: BoxSubAddresses,
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PowerMeterDeviceConfig {
    pub device_id: String,
    pub name: String,
    pub endpoint: EndpointKey,
    pub slave_id: u8,
    pub energy: EnergyProfile,
    pub enabled: bool,
}

/// Everything one collection cycle needs to know about the site
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceConfigSet {
    pub boxes: Vec<BoxDeviceConfig>,
    pub power_meters: Vec<PowerMeterDeviceConfig>,
}

impl DeviceConfigSet {
    pub fn from_files(boxes: BoxSiteFile, power: Option<PowerMeterFile>) -> Result<Self, ConfigError> {
        let set = Self {
            boxes: resolve_boxes(boxes),
            power_meters: power.map(resolve_power_meters).unwrap_or_default(),
        };
        set.validate()?;
        Ok(set)
    }

    /// Resolve and validate the box family on its own
    pub fn boxes_from_file(file: BoxSiteFile) -> Result<Vec<BoxDeviceConfig>, ConfigError> {
        let set = Self {
            boxes: resolve_boxes(file),
            power_meters: Vec::new(),
        };
        set.validate()?;
        Ok(set.boxes)
    }

    /// Resolve and validate the power meter family on its own
    pub fn power_meters_from_file(
        file: PowerMeterFile,
    ) -> Result<Vec<PowerMeterDeviceConfig>, ConfigError> {
        let set = Self {
            boxes: Vec::new(),
            power_meters: resolve_power_meters(file),
        };
        set.validate()?;
        Ok(set.power_meters)
    }

    pub fn boxes_of(&self, kind: BoxKind) -> impl Iterator<Item = &BoxDeviceConfig> {
        self.boxes.iter().filter(move |b| b.kind == kind)
    }

    /// Reject configurations that would make two records indistinguishable
    /// or address the broadcast slave
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for device in &self.boxes {
            if !seen.insert(device.device_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate box device id {}",
                    device.device_id
                )));
            }
            check_host(&device.device_id, &device.endpoint)?;
            let ids = device.sub_addresses;
            for slave in [ids.temp1, ids.temp2, ids.flow] {
                check_slave(&device.device_id, slave)?;
            }
        }

        let mut seen = HashSet::new();
        for meter in &self.power_meters {
            if !seen.insert(meter.device_id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate power meter device id {}",
                    meter.device_id
                )));
            }
            check_host(&meter.device_id, &meter.endpoint)?;
            check_slave(&meter.device_id, meter.slave_id)?;
        }
        Ok(())
    }
}

fn check_host(device_id: &str, endpoint: &EndpointKey) -> Result<(), ConfigError> {
    if endpoint.host.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("[{device_id}] empty ip")));
    }
    Ok(())
}

fn check_slave(device_id: &str, slave: u8) -> Result<(), ConfigError> {
    if slave == 0 || slave > defaults::MAX_SLAVE_ID {
        return Err(ConfigError::Invalid(format!(
            "[{device_id}] slave id {slave} outside 1..={}",
            defaults::MAX_SLAVE_ID
        )));
    }
    Ok(())
}

fn resolve_boxes(file: BoxSiteFile) -> Vec<BoxDeviceConfig> {
    let to_config = |kind: BoxKind| {
        move |entry: BoxEntry| BoxDeviceConfig {
            endpoint: EndpointKey::new(entry.ip, entry.port),
            device_id: entry.device_id,
            kind,
            sub_addresses: entry.sensors.into(),
            enabled: entry.enabled,
        }
    };
    file.heatpump
        .into_iter()
        .map(to_config(BoxKind::Heatpump))
        .chain(file.groundpipe.into_iter().map(to_config(BoxKind::Groundpipe)))
        .collect()
}

fn resolve_power_meters(file: PowerMeterFile) -> Vec<PowerMeterDeviceConfig> {
    let endpoint = EndpointKey::new(file.ip, file.port);
    file.meters
        .into_iter()
        .map(|meter| PowerMeterDeviceConfig {
            energy: EnergyProfile {
                encoding: meter.energy_encoding.unwrap_or(file.energy_encoding),
                register: file.energy_register,
            },
            device_id: meter.device_id,
            name: meter.name,
            endpoint: endpoint.clone(),
            slave_id: meter.slave_id,
            enabled: meter.enabled,
        })
        .collect()
}

pub fn box_sites_from_str(raw: &str) -> Result<BoxSiteFile, ConfigError> {
    serde_json::from_str::<BoxSiteFile>(raw).map_err(Into::into)
}

pub fn power_meters_from_str(raw: &str) -> Result<PowerMeterFile, ConfigError> {
    serde_json::from_str::<PowerMeterFile>(raw).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOXES: &str = r#"{
        "heatpump": [
            {"device_id": "HP_1", "ip": "192.168.0.11", "port": 8899,
             "sensors": {"temp1_slave_id": 1, "temp2_slave_id": 2, "flow_slave_id": 3}},
            {"device_id": "HP_2", "ip": "192.168.0.11", "enabled": false,
             "sensors": {"temp1_slave_id": 4, "temp2_slave_id": 5, "flow_slave_id": 6}}
        ],
        "groundpipe": [
            {"device_id": "GP_1", "ip": "192.168.0.12"}
        ]
    }"#;

    const METERS: &str = r#"{
        "ip": "192.168.0.20",
        "energy_encoding": "float32",
        "meters": [
            {"device_id": "HP_1", "name": "Heat pump 1", "slave_id": 1},
            {"device_id": "HP_2", "slave_id": 2, "energy_encoding": "scaled_u32"}
        ]
    }"#;

    fn parsed() -> DeviceConfigSet {
        DeviceConfigSet::from_files(
            box_sites_from_str(BOXES).unwrap(),
            Some(power_meters_from_str(METERS).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn box_defaults_apply() {
        let set = parsed();
        let gp = set.boxes_of(BoxKind::Groundpipe).next().unwrap();
        assert_eq!(gp.endpoint, EndpointKey::new("192.168.0.12", 8899));
        assert!(gp.enabled);
        assert_eq!(
            gp.sub_addresses,
            BoxSubAddresses {
                temp1: 1,
                temp2: 2,
                flow: 3
            }
        );
        assert!(!set.boxes[1].enabled);
        assert_eq!(set.boxes_of(BoxKind::Heatpump).count(), 2);
    }

    #[test]
    fn meters_share_site_endpoint_and_override_encoding() {
        let set = parsed();
        assert_eq!(set.power_meters.len(), 2);
        assert_eq!(set.power_meters[0].endpoint, set.power_meters[1].endpoint);
        assert_eq!(set.power_meters[0].energy.encoding, EnergyEncoding::Float32);
        assert_eq!(set.power_meters[0].energy.register, 0x0404);
        assert_eq!(set.power_meters[1].energy.encoding, EnergyEncoding::ScaledU32);
    }

    #[test]
    fn missing_energy_encoding_is_rejected() {
        let raw = r#"{"ip": "10.0.0.1", "meters": []}"#;
        assert!(matches!(
            power_meters_from_str(raw),
            Err(ConfigError::ParseJson(_))
        ));
    }

    #[test]
    fn duplicate_device_ids_are_rejected() {
        let raw = r#"{
            "heatpump": [{"device_id": "HP_1", "ip": "10.0.0.1"}],
            "groundpipe": [{"device_id": "HP_1", "ip": "10.0.0.2"}]
        }"#;
        let err = DeviceConfigSet::from_files(box_sites_from_str(raw).unwrap(), None).unwrap_err();
        assert!(err.to_string().contains("duplicate box device id HP_1"));
    }

    #[test]
    fn broadcast_slave_is_rejected() {
        let raw = r#"{"heatpump": [{"device_id": "HP_1", "ip": "10.0.0.1",
            "sensors": {"temp1_slave_id": 0}}]}"#;
        assert!(matches!(
            DeviceConfigSet::from_files(box_sites_from_str(raw).unwrap(), None),
            Err(ConfigError::Invalid(_))
        ));
    }
}
