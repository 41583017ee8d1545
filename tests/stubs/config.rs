use once_cell::sync::Lazy;

use fieldpoll::data_mgmt::process::EnergyEncoding;
use fieldpoll::node_mgmt::config::{
    box_sites_from_str, power_meters_from_str, BoxDeviceConfig, BoxKind, BoxSubAddresses,
    DeviceConfigSet, PowerMeterDeviceConfig,
};
use fieldpoll::readers::modbus_rtu_tcp::EndpointKey;
use fieldpoll::readers::protocol::{EnergyProfile, DEFAULT_ENERGY_REGISTER};

pub const BOX_IPS: &str = r#"
{
    "heatpump": [
        {
            "device_id": "HP_1",
            "ip": "192.168.0.11",
            "port": 8899,
            "enabled": true,
            "sensors": {"temp1_slave_id": 1, "temp2_slave_id": 2, "flow_slave_id": 3}
        },
        {
            "device_id": "HP_2",
            "ip": "192.168.0.11",
            "port": 8899,
            "enabled": true,
            "sensors": {"temp1_slave_id": 4, "temp2_slave_id": 5, "flow_slave_id": 6}
        }
    ],
    "groundpipe": [
        {
            "device_id": "GP_1",
            "ip": "192.168.0.12",
            "enabled": false
        }
    ]
}
"#;

pub const POWER_METERS: &str = r#"
{
    "ip": "192.168.0.20",
    "port": 8899,
    "energy_encoding": "float32",
    "energy_register": 1028,
    "meters": [
        {"device_id": "HP_1", "name": "Heat pump 1", "slave_id": 1, "description": "Plant room"},
        {"device_id": "HP_2", "name": "Heat pump 2", "slave_id": 2, "description": "Plant room",
         "energy_encoding": "scaled_u32"}
    ]
}
"#;

/// No energy_encoding declared for the site
pub const BAD_POWER_METERS: &str = r#"
{
    "ip": "192.168.0.20",
    "meters": [{"device_id": "HP_1", "name": "Heat pump 1", "slave_id": 1}]
}
"#;

/// `BOX_IPS` and `POWER_METERS` resolved into one configuration
pub static EXAMPLE_SITE: Lazy<DeviceConfigSet> = Lazy::new(|| {
    DeviceConfigSet::from_files(
        box_sites_from_str(BOX_IPS).unwrap(),
        Some(power_meters_from_str(POWER_METERS).unwrap()),
    )
    .unwrap()
});

pub fn heatpump(device_id: &str, host: &str, slaves: [u8; 3]) -> BoxDeviceConfig {
    box_device(device_id, BoxKind::Heatpump, host, slaves)
}

pub fn groundpipe(device_id: &str, host: &str, slaves: [u8; 3]) -> BoxDeviceConfig {
    box_device(device_id, BoxKind::Groundpipe, host, slaves)
}

pub fn box_device(device_id: &str, kind: BoxKind, host: &str, slaves: [u8; 3]) -> BoxDeviceConfig {
    BoxDeviceConfig {
        device_id: device_id.to_string(),
        kind,
        endpoint: EndpointKey::new(host, 8899),
        sub_addresses: BoxSubAddresses {
            temp1: slaves[0],
            temp2: slaves[1],
            flow: slaves[2],
        },
        enabled: true,
    }
}

pub fn meter(device_id: &str, host: &str, slave_id: u8, encoding: EnergyEncoding) -> PowerMeterDeviceConfig {
    PowerMeterDeviceConfig {
        device_id: device_id.to_string(),
        name: device_id.to_string(),
        endpoint: EndpointKey::new(host, 8899),
        slave_id,
        energy: EnergyProfile {
            encoding,
            register: DEFAULT_ENERGY_REGISTER,
        },
        enabled: true,
    }
}
