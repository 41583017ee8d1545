pub mod box_sensor;
pub mod modbus_rtu_tcp;
pub mod power_meter;
pub mod protocol;

use thiserror::Error;

use crate::data_mgmt::process::DecodeError;
use modbus_rtu_tcp::TransportError;

pub use box_sensor::BoxSensorReader;
pub use power_meter::PowerMeterReader;

#[derive(Error, Debug)]
pub enum ReadError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("could not decode registers: {0}")]
    Decode(#[from] DecodeError),
    #[error("[{device_id}] every sensor read failed")]
    AllSubReadsFailed { device_id: String },
    #[error("read cancelled")]
    Cancelled,
}
