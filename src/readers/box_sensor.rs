use std::fmt;

use chrono::Utc;

use super::modbus_rtu_tcp::{EndpointLock, TransportError};
use super::protocol::{self, RegisterBlock};
use super::ReadError;
use crate::data_mgmt::models::SensorReading;
use crate::data_mgmt::process::{decode_flow, decode_temperature};
use crate::helpers::StopSignal;
use crate::node_mgmt::config::{BoxDeviceConfig, BoxSubAddresses};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SensorRole {
    Temp1,
    Temp2,
    Flow,
}

impl SensorRole {
    /// Fixed order of the sub-reads of one box
    const ALL: [SensorRole; 3] = [SensorRole::Temp1, SensorRole::Temp2, SensorRole::Flow];

    fn slave(&self, ids: &BoxSubAddresses) -> u8 {
        match self {
            SensorRole::Temp1 => ids.temp1,
            SensorRole::Temp2 => ids.temp2,
            SensorRole::Flow => ids.flow,
        }
    }

    fn block(&self) -> RegisterBlock {
        match self {
            SensorRole::Temp1 | SensorRole::Temp2 => protocol::TEMPERATURE,
            SensorRole::Flow => protocol::FLOW,
        }
    }
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SensorRole::Temp1 => "temperature 1",
            SensorRole::Temp2 => "temperature 2",
            SensorRole::Flow => "flow",
        })
    }
}

/// Reads the two temperature sensors and the flow sensor of a sensor box
///
/// Every sensor sits on its own slave id behind the box's gateway. The
/// endpoint lock is taken separately for each of the three transactions, so
/// other boxes on the same gateway interleave with this one.
pub struct BoxSensorReader {
    endpoint: EndpointLock,
}

impl BoxSensorReader {
    pub fn new(endpoint: EndpointLock) -> Self {
        Self { endpoint }
    }

    /// Read all three sensors of `device`
    ///
    /// Failed sub-reads leave their field empty. Fails only when no sensor
    /// could be read at all.
    pub async fn read_all_sensors(
        &self,
        device: &BoxDeviceConfig,
        stop: &StopSignal,
    ) -> Result<SensorReading, ReadError> {
        let timestamp = Utc::now();
        let mut values: [Option<f64>; 3] = [None; 3];

        for (value, role) in values.iter_mut().zip(SensorRole::ALL) {
            if stop.is_stopped() {
                log::debug!("[{}] Stop requested, skipping {} read", device.device_id, role);
                break;
            }
            let slave = role.slave(&device.sub_addresses);
            match self.read_role(role, slave).await {
                Ok(v) => {
                    log::debug!("[{}] {}: {}", device.device_id, role, v);
                    *value = Some(v);
                }
                Err(e) => log::warn!(
                    "[{}] {} read failed (slave {}): {}",
                    device.device_id,
                    role,
                    slave,
                    e
                ),
            }
        }

        let [input_temp, output_temp, flow] = values;
        let reading = SensorReading {
            device_id: device.device_id.clone(),
            input_temp,
            output_temp,
            flow,
            timestamp,
        };

        if reading.present_fields() == 0 {
            if stop.is_stopped() {
                return Err(ReadError::Cancelled);
            }
            return Err(ReadError::AllSubReadsFailed {
                device_id: device.device_id.clone(),
            });
        }
        Ok(reading)
    }

    async fn read_role(&self, role: SensorRole, slave: u8) -> Result<f64, ReadError> {
        let registers = self.read_block(slave, role.block()).await?;
        let value = match role {
            SensorRole::Temp1 | SensorRole::Temp2 => {
                decode_temperature(&registers, protocol::TEMPERATURE_INDEX)?
            }
            SensorRole::Flow => decode_flow(&registers)?,
        };
        Ok(value)
    }

    async fn read_block(&self, slave: u8, block: RegisterBlock) -> Result<Vec<u16>, TransportError> {
        let mut handle = self.endpoint.acquire().await?;
        handle
            .read_holding_registers(slave, block.address, block.count)
            .await
    }
}
