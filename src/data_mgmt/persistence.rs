use std::path::Path;

use futures::future::BoxFuture;
use readings_store::{AsyncReadingsDb, ElecRow, GroundpipeRow, HeatpumpRow, StoreError};
use thiserror::Error;

use crate::data_mgmt::models::{PowerReading, SensorRecord};
use crate::node_mgmt::config::BoxKind;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("readings store error: {0}")]
    Store(#[from] StoreError),
    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Where collected records go
pub trait ReadingSink: Send + Sync {
    fn insert_sensor_reading<'a>(
        &'a self,
        record: &'a SensorRecord,
    ) -> BoxFuture<'a, Result<(), SinkError>>;

    fn insert_power_reading<'a>(
        &'a self,
        reading: &'a PowerReading,
    ) -> BoxFuture<'a, Result<(), SinkError>>;
}

/// Persists records into the heatpump, groundpipe and elec tables
#[derive(Clone)]
pub struct SqliteSink {
    db: AsyncReadingsDb,
}

impl SqliteSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(AsyncReadingsDb::open(path).await?))
    }

    pub fn new(db: AsyncReadingsDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &AsyncReadingsDb {
        &self.db
    }
}

impl ReadingSink for SqliteSink {
    fn insert_sensor_reading<'a>(
        &'a self,
        record: &'a SensorRecord,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            let reading = &record.reading;
            match record.kind {
                BoxKind::Heatpump => {
                    self.db
                        .insert_heatpump(HeatpumpRow {
                            device_id: reading.device_id.clone(),
                            timestamp: reading.timestamp,
                            input_temp: reading.input_temp,
                            output_temp: reading.output_temp,
                            flow: reading.flow,
                            energy: record.energy,
                        })
                        .await?
                }
                BoxKind::Groundpipe => {
                    self.db
                        .insert_groundpipe(GroundpipeRow {
                            device_id: reading.device_id.clone(),
                            timestamp: reading.timestamp,
                            input_temp: reading.input_temp,
                            output_temp: reading.output_temp,
                            flow: reading.flow,
                        })
                        .await?
                }
            }
            Ok(())
        })
    }

    fn insert_power_reading<'a>(
        &'a self,
        reading: &'a PowerReading,
    ) -> BoxFuture<'a, Result<(), SinkError>> {
        Box::pin(async move {
            self.db
                .insert_elec(ElecRow {
                    device_id: reading.device_id.clone(),
                    timestamp: reading.timestamp,
                    total_energy: reading.total_energy,
                })
                .await?;
            Ok(())
        })
    }
}
