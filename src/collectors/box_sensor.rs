use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use super::DeviceResults;
use crate::data_mgmt::models::{PowerReadings, SensorRecord};
use crate::data_mgmt::persistence::ReadingSink;
use crate::helpers::StopSignal;
use crate::node_mgmt::config::{BoxDeviceConfig, BoxKind};
use crate::readers::modbus_rtu_tcp::{EndpointKey, TransportRegistry};
use crate::readers::{BoxSensorReader, ReadError};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoxResults {
    pub heatpump: DeviceResults,
    pub groundpipe: DeviceResults,
}

impl BoxResults {
    fn of_kind(&mut self, kind: BoxKind) -> &mut DeviceResults {
        match kind {
            BoxKind::Heatpump => &mut self.heatpump,
            BoxKind::Groundpipe => &mut self.groundpipe,
        }
    }
}

/// Reads every enabled sensor box and persists what it gets
pub struct BoxSensorCollector {
    registry: Arc<TransportRegistry>,
    sink: Arc<dyn ReadingSink>,
    readers: Mutex<HashMap<EndpointKey, Arc<BoxSensorReader>>>,
}

impl BoxSensorCollector {
    pub fn new(registry: Arc<TransportRegistry>, sink: Arc<dyn ReadingSink>) -> Self {
        Self {
            registry,
            sink,
            readers: Mutex::new(HashMap::new()),
        }
    }

    /// Read and persist all enabled boxes, one after another
    ///
    /// A failing box never stops the others. Heat pump records get the energy
    /// value of the power meter with the same device id from `power`.
    pub async fn collect_all(
        &self,
        devices: &[BoxDeviceConfig],
        power: Option<&PowerReadings>,
        stop: &StopSignal,
    ) -> BoxResults {
        let mut results = BoxResults::default();

        for device in devices {
            if !device.enabled {
                log::debug!("[{}] Disabled, skipping", device.device_id);
                continue;
            }
            if stop.is_stopped() {
                log::info!("Stop requested, box collection ends early");
                break;
            }
            match self.collect_device(device, power, stop).await {
                Some(ok) => {
                    results.of_kind(device.kind).insert(device.device_id.clone(), ok);
                }
                None => break,
            }
        }

        log::info!(
            "Box collection done: heatpump {}/{}, groundpipe {}/{}",
            results.heatpump.values().filter(|ok| **ok).count(),
            results.heatpump.len(),
            results.groundpipe.values().filter(|ok| **ok).count(),
            results.groundpipe.len()
        );
        results
    }

    /// `None` when the read was cancelled before any sensor answered
    async fn collect_device(
        &self,
        device: &BoxDeviceConfig,
        power: Option<&PowerReadings>,
        stop: &StopSignal,
    ) -> Option<bool> {
        let reader = self.reader_for(&device.endpoint).await;
        let reading = match reader.read_all_sensors(device, stop).await {
            Ok(reading) => reading,
            Err(ReadError::Cancelled) => return None,
            Err(e) => {
                log::error!("[{}] {} read failed: {}", device.device_id, device.kind, e);
                return Some(false);
            }
        };

        let energy = match device.kind {
            BoxKind::Heatpump => power
                .and_then(|readings| readings.get(&device.device_id))
                .and_then(|reading| reading.total_energy),
            BoxKind::Groundpipe => None,
        };
        let record = SensorRecord {
            kind: device.kind,
            reading,
            energy,
        };

        match self.sink.insert_sensor_reading(&record).await {
            Ok(()) => {
                log::debug!("[{}] Saved {} record", device.device_id, device.kind);
                Some(true)
            }
            Err(e) => {
                log::error!("[{}] Failed to save {} record: {}", device.device_id, device.kind, e);
                Some(false)
            }
        }
    }

    /// Boxes behind the same gateway share one reader and thus one endpoint lock
    async fn reader_for(&self, endpoint: &EndpointKey) -> Arc<BoxSensorReader> {
        let mut readers = self.readers.lock().await;
        if let Some(reader) = readers.get(endpoint) {
            return reader.clone();
        }
        let reader = Arc::new(BoxSensorReader::new(self.registry.lock_for(endpoint).await));
        readers.insert(endpoint.clone(), reader.clone());
        reader
    }
}
