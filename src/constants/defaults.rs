use std::time::Duration;

pub const LOG_LEVEL: &str = "info";
pub const CONFIG_DIR: &str = "config";
pub const DATA_DIR: &str = "data";

pub const BOX_CONFIG_FILE: &str = "box_ips.json";
pub const POWER_METER_CONFIG_FILE: &str = "power_meter_config.json";
pub const READINGS_DB_FILE: &str = "readings.db";

pub const COLLECTION_INTERVAL: Duration = Duration::from_secs(60);
pub const MODBUS_TCP_TIMEOUT: Duration = Duration::from_secs(3);
pub const MODBUS_CONNECT_RETRY_WINDOW: Duration = Duration::ZERO;
pub const SERVICE_STOP_TIMEOUT: Duration = Duration::from_secs(5);
