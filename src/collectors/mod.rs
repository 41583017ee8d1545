mod box_sensor;
mod orchestrator;
mod power_meter;

use std::collections::BTreeMap;

use serde::Serialize;

pub use box_sensor::{BoxResults, BoxSensorCollector};
pub use orchestrator::Orchestrator;
pub use power_meter::{PowerMeterCollector, PowerResults};

/// Per-device success flags of one collection pass, keyed by device id
///
/// Disabled devices never appear.
pub type DeviceResults = BTreeMap<String, bool>;

/// Outcome of one cycle across both families
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CycleResults {
    pub power_meter: DeviceResults,
    pub heatpump: DeviceResults,
    pub groundpipe: DeviceResults,
}

impl CycleResults {
    pub fn from_power(power: PowerResults) -> Self {
        Self {
            power_meter: power.results,
            ..Self::default()
        }
    }

    pub fn from_boxes(boxes: BoxResults) -> Self {
        Self {
            heatpump: boxes.heatpump,
            groundpipe: boxes.groundpipe,
            ..Self::default()
        }
    }

    fn all(&self) -> impl Iterator<Item = bool> + '_ {
        self.power_meter
            .values()
            .chain(self.heatpump.values())
            .chain(self.groundpipe.values())
            .copied()
    }

    pub fn attempted(&self) -> usize {
        self.all().count()
    }

    pub fn succeeded(&self) -> usize {
        self.all().filter(|ok| *ok).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.succeeded()
    }
}
