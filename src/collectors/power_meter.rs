use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::DeviceResults;
use crate::data_mgmt::models::PowerReadings;
use crate::data_mgmt::persistence::ReadingSink;
use crate::helpers::StopSignal;
use crate::node_mgmt::config::PowerMeterDeviceConfig;
use crate::readers::modbus_rtu_tcp::{EndpointKey, TransportRegistry};
use crate::readers::PowerMeterReader;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PowerResults {
    pub results: DeviceResults,
    /// Every reading taken in this pass, whether or not it could be saved
    pub readings: PowerReadings,
}

pub struct PowerMeterCollector {
    registry: Arc<TransportRegistry>,
    sink: Arc<dyn ReadingSink>,
    readers: Mutex<HashMap<EndpointKey, Arc<PowerMeterReader>>>,
}

impl PowerMeterCollector {
    pub fn new(registry: Arc<TransportRegistry>, sink: Arc<dyn ReadingSink>) -> Self {
        Self {
            registry,
            sink,
            readers: Mutex::new(HashMap::new()),
        }
    }

    pub async fn collect_all(
        &self,
        meters: &[PowerMeterDeviceConfig],
        stop: &StopSignal,
    ) -> PowerResults {
        let mut out = PowerResults::default();

        for meter in meters {
            if !meter.enabled {
                log::debug!("[{}] Disabled, skipping", meter.device_id);
                continue;
            }
            if stop.is_stopped() {
                log::info!("Stop requested, power meter collection ends early");
                break;
            }

            let reader = self.reader_for(&meter.endpoint).await;
            let reading = match reader.read_energy(meter).await {
                Ok(reading) => reading,
                Err(e) => {
                    log::error!(
                        "[{}] Power meter read failed (slave {} at {}): {}",
                        meter.device_id,
                        meter.slave_id,
                        meter.endpoint,
                        e
                    );
                    out.results.insert(meter.device_id.clone(), false);
                    continue;
                }
            };

            let saved = match self.sink.insert_power_reading(&reading).await {
                Ok(()) => true,
                Err(e) => {
                    log::error!("[{}] Failed to save power reading: {}", meter.device_id, e);
                    false
                }
            };
            out.results.insert(meter.device_id.clone(), saved);
            out.readings.insert(meter.device_id.clone(), reading);
        }

        log::info!(
            "Power meter collection done: {}/{} succeeded",
            out.results.values().filter(|ok| **ok).count(),
            out.results.len()
        );
        out
    }

    async fn reader_for(&self, endpoint: &EndpointKey) -> Arc<PowerMeterReader> {
        let mut readers = self.readers.lock().await;
        if let Some(reader) = readers.get(endpoint) {
            return reader.clone();
        }
        let reader = Arc::new(PowerMeterReader::new(self.registry.lock_for(endpoint).await));
        readers.insert(endpoint.clone(), reader.clone());
        reader
    }
}
