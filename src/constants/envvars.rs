pub const CONFIG_DIR: &str = "FP_CONFIG_DIR";
pub const DATA_DIR: &str = "FP_DATA_DIR";

pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const COLLECTION_INTERVAL: &str = "COLLECTION_INTERVAL";
pub const MODBUS_TCP_TIMEOUT: &str = "MODBUS_TCP_TIMEOUT";
pub const MODBUS_CONNECT_RETRY_WINDOW: &str = "MODBUS_CONNECT_RETRY_WINDOW";
pub const SERVICE_STOP_TIMEOUT: &str = "SERVICE_STOP_TIMEOUT";
