pub mod config;
pub mod settings;
pub mod source;

pub use config::{ConfigError, DeviceConfigSet};
pub use settings::Settings;
pub use source::{ConfigSource, FileConfigSource, StaticConfigSource};
