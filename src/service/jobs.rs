use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures::future::BoxFuture;

use crate::collectors::{BoxSensorCollector, CycleResults, Orchestrator, PowerMeterCollector};
use crate::data_mgmt::models::PowerReadings;
use crate::data_mgmt::persistence::ReadingSink;
use crate::helpers::StopSignal;
use crate::node_mgmt::source::ConfigSource;
use crate::readers::modbus_rtu_tcp::TransportRegistry;

/// One collection cycle, run repeatedly by a service
///
/// The configuration is loaded anew at the start of each cycle; an `Err`
/// means the cycle as a whole could not run.
pub trait CollectionJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn run_cycle<'a>(&'a self, stop: &'a StopSignal) -> BoxFuture<'a, Result<CycleResults>>;
}

/// Power meters only
pub struct PowerMeterJob {
    config: Arc<dyn ConfigSource>,
    collector: PowerMeterCollector,
    latest: Mutex<Option<PowerReadings>>,
}

impl PowerMeterJob {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        registry: Arc<TransportRegistry>,
        sink: Arc<dyn ReadingSink>,
    ) -> Self {
        Self {
            config,
            collector: PowerMeterCollector::new(registry, sink),
            latest: Mutex::new(None),
        }
    }

    /// Readings of the last finished cycle
    pub fn latest_readings(&self) -> Option<PowerReadings> {
        self.latest.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl CollectionJob for PowerMeterJob {
    fn name(&self) -> &'static str {
        "power_meter"
    }

    fn run_cycle<'a>(&'a self, stop: &'a StopSignal) -> BoxFuture<'a, Result<CycleResults>> {
        Box::pin(async move {
            let meters = self.config.load_power_meters()?;
            let power = self.collector.collect_all(&meters, stop).await;
            *self.latest.lock().unwrap_or_else(|e| e.into_inner()) = Some(power.readings.clone());
            Ok(CycleResults::from_power(power))
        })
    }
}

/// Sensor boxes only; heat pump records get no energy value
pub struct BoxSensorJob {
    config: Arc<dyn ConfigSource>,
    collector: BoxSensorCollector,
}

impl BoxSensorJob {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        registry: Arc<TransportRegistry>,
        sink: Arc<dyn ReadingSink>,
    ) -> Self {
        Self {
            config,
            collector: BoxSensorCollector::new(registry, sink),
        }
    }
}

impl CollectionJob for BoxSensorJob {
    fn name(&self) -> &'static str {
        "box_sensor"
    }

    fn run_cycle<'a>(&'a self, stop: &'a StopSignal) -> BoxFuture<'a, Result<CycleResults>> {
        Box::pin(async move {
            let boxes = self.config.load_boxes()?;
            let boxes = self.collector.collect_all(&boxes, None, stop).await;
            Ok(CycleResults::from_boxes(boxes))
        })
    }
}

/// Both families in one cycle, power meters first
pub struct OrchestratorJob {
    config: Arc<dyn ConfigSource>,
    orchestrator: Orchestrator,
}

impl OrchestratorJob {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        registry: Arc<TransportRegistry>,
        sink: Arc<dyn ReadingSink>,
    ) -> Self {
        Self {
            config,
            orchestrator: Orchestrator::new(registry, sink),
        }
    }
}

impl CollectionJob for OrchestratorJob {
    fn name(&self) -> &'static str {
        "orchestrator"
    }

    fn run_cycle<'a>(&'a self, stop: &'a StopSignal) -> BoxFuture<'a, Result<CycleResults>> {
        Box::pin(async move {
            let config = self.config.load()?;
            Ok(self.orchestrator.run_cycle(&config, stop).await)
        })
    }
}
