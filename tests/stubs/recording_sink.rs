use std::collections::HashSet;
use std::sync::Mutex;

use futures::future::BoxFuture;

use fieldpoll::data_mgmt::models::{PowerReading, SensorRecord};
use fieldpoll::data_mgmt::persistence::{ReadingSink, SinkError};

/// Keeps every record it is given; can be told to reject some devices
#[derive(Default)]
pub struct RecordingSink {
    sensor: Mutex<Vec<SensorRecord>>,
    power: Mutex<Vec<PowerReading>>,
    rejected: Mutex<HashSet<String>>,
}

impl RecordingSink {
    pub fn reject(&self, device_id: &str) {
        self.rejected.lock().unwrap().insert(device_id.to_string());
    }

    pub fn sensor_records(&self) -> Vec<SensorRecord> {
        self.sensor.lock().unwrap().clone()
    }

    pub fn power_readings(&self) -> Vec<PowerReading> {
        self.power.lock().unwrap().clone()
    }

    fn check(&self, device_id: &str) -> Result<(), SinkError> {
        if self.rejected.lock().unwrap().contains(device_id) {
            return Err(SinkError::Rejected(format!("{device_id} is read-only")));
        }
        Ok(())
    }
}

impl ReadingSink for RecordingSink {
    fn insert_sensor_reading<'a>(
        &'a self,
        record: &'a SensorRecord,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.check(&record.reading.device_id)?;
            self.sensor.lock().unwrap().push(record.clone());
            Ok(())
        })
    }

    fn insert_power_reading<'a>(
        &'a self,
        reading: &'a PowerReading,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.check(&reading.device_id)?;
            self.power.lock().unwrap().push(reading.clone());
            Ok(())
        })
    }
}
