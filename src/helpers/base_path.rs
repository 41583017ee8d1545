use std::{env, path::PathBuf};

use crate::constants::{defaults, envvars};

pub fn config_dir() -> PathBuf {
    if let Ok(config_dir) = env::var(envvars::CONFIG_DIR) {
        return config_dir.into();
    }
    PathBuf::from(defaults::CONFIG_DIR)
}

pub fn data_dir() -> PathBuf {
    if let Ok(data_dir) = env::var(envvars::DATA_DIR) {
        return data_dir.into();
    }
    PathBuf::from(defaults::DATA_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_default_dirs() {
        temp_env::with_vars(
            [
                (envvars::CONFIG_DIR, Some("/etc/fieldpoll")),
                (envvars::DATA_DIR, None),
            ],
            || {
                assert_eq!(config_dir(), PathBuf::from("/etc/fieldpoll"));
                assert_eq!(data_dir(), PathBuf::from(defaults::DATA_DIR));
            },
        );
    }
}
