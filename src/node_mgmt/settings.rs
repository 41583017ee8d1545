use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{defaults, envvars};
use crate::helpers::base_path;
use crate::node_mgmt::config::ConfigError;

/// Runtime settings taken from the environment
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub collection_interval: Duration,
    pub io_timeout: Duration,
    pub connect_retry_window: Duration,
    pub stop_timeout: Duration,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            config_dir: base_path::config_dir(),
            data_dir: base_path::data_dir(),
            collection_interval: nonzero_secs_from_env(
                envvars::COLLECTION_INTERVAL,
                defaults::COLLECTION_INTERVAL,
            )?,
            io_timeout: nonzero_secs_from_env(
                envvars::MODBUS_TCP_TIMEOUT,
                defaults::MODBUS_TCP_TIMEOUT,
            )?,
            connect_retry_window: secs_from_env(
                envvars::MODBUS_CONNECT_RETRY_WINDOW,
                defaults::MODBUS_CONNECT_RETRY_WINDOW,
            )?,
            stop_timeout: secs_from_env(
                envvars::SERVICE_STOP_TIMEOUT,
                defaults::SERVICE_STOP_TIMEOUT,
            )?,
        })
    }

    pub fn readings_db_path(&self) -> PathBuf {
        self.data_dir.join(defaults::READINGS_DB_FILE)
    }
}

fn secs_from_env(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .ok_or(ConfigError::InvalidEnv { var, value }),
        Err(_) => Ok(default),
    }
}

fn nonzero_secs_from_env(var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let secs = secs_from_env(var, default)?;
    if secs.is_zero() {
        return Err(ConfigError::InvalidEnv {
            var,
            value: env::var(var).unwrap_or_default(),
        });
    }
    Ok(secs)
}
