use chrono::Utc;

use super::modbus_rtu_tcp::EndpointLock;
use super::ReadError;
use crate::data_mgmt::models::PowerReading;
use crate::data_mgmt::process::decode_energy;
use crate::node_mgmt::config::PowerMeterDeviceConfig;

/// Reads the cumulative energy counter of power meters behind one gateway
pub struct PowerMeterReader {
    endpoint: EndpointLock,
}

impl PowerMeterReader {
    pub fn new(endpoint: EndpointLock) -> Self {
        Self { endpoint }
    }

    /// One transaction; any transport, protocol or decode error fails the read
    pub async fn read_energy(&self, meter: &PowerMeterDeviceConfig) -> Result<PowerReading, ReadError> {
        let timestamp = Utc::now();
        let block = meter.energy.block();

        let registers = {
            let mut handle = self.endpoint.acquire().await?;
            handle
                .read_holding_registers(meter.slave_id, block.address, block.count)
                .await?
        };
        let energy = decode_energy(&registers, meter.energy.encoding)?;
        log::debug!(
            "[{}] energy {} kWh ({:?} at {:#06x})",
            meter.device_id,
            energy,
            meter.energy.encoding,
            block.address
        );

        Ok(PowerReading {
            device_id: meter.device_id.clone(),
            total_energy: Some(energy),
            timestamp,
        })
    }
}
