mod check_config;
mod start_readings;

pub use check_config::check_config;
pub use start_readings::start_readings;
