use std::sync::Arc;

use super::{BoxSensorCollector, CycleResults, PowerMeterCollector};
use crate::data_mgmt::persistence::ReadingSink;
use crate::helpers::StopSignal;
use crate::node_mgmt::config::DeviceConfigSet;
use crate::readers::modbus_rtu_tcp::TransportRegistry;

/// Runs the power meters, then the boxes, within one cycle
///
/// Heat pump records must carry energy values from this very cycle, so the box
/// pass only starts once the power pass has finished.
pub struct Orchestrator {
    power: PowerMeterCollector,
    boxes: BoxSensorCollector,
}

impl Orchestrator {
    pub fn new(registry: Arc<TransportRegistry>, sink: Arc<dyn ReadingSink>) -> Self {
        Self {
            power: PowerMeterCollector::new(registry.clone(), sink.clone()),
            boxes: BoxSensorCollector::new(registry, sink),
        }
    }

    pub async fn run_cycle(&self, config: &DeviceConfigSet, stop: &StopSignal) -> CycleResults {
        let power = self.power.collect_all(&config.power_meters, stop).await;
        let boxes = self
            .boxes
            .collect_all(&config.boxes, Some(&power.readings), stop)
            .await;

        CycleResults {
            power_meter: power.results,
            heatpump: boxes.heatpump,
            groundpipe: boxes.groundpipe,
        }
    }
}
