use std::collections::HashMap;

use chrono::{DateTime, offset::Utc};
use serde::{Deserialize, Serialize};

use crate::node_mgmt::config::BoxKind;

/// Values read from one sensor box in one pass
///
/// Sub-reads fail independently, so any field may be absent. A reading with
/// every field absent is never handed out; the reader reports a failure instead.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SensorReading {
    pub device_id: String,
    /// Temperature sensor 1, °C
    pub input_temp: Option<f64>,
    /// Temperature sensor 2, °C
    pub output_temp: Option<f64>,
    /// L/min
    pub flow: Option<f64>,
    /// When the read started
    pub timestamp: DateTime<Utc>,
}

impl SensorReading {
    pub fn present_fields(&self) -> usize {
        [self.input_temp, self.output_temp, self.flow]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PowerReading {
    pub device_id: String,
    /// Cumulative energy, kWh
    pub total_energy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Power readings of one cycle keyed by device id
pub type PowerReadings = HashMap<String, PowerReading>;

/// A box reading as handed to persistence
///
/// Heat pump records carry the energy value read from the matching power meter
/// in the same cycle; ground pipe records never do.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorRecord {
    pub kind: BoxKind,
    pub reading: SensorReading,
    pub energy: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_present_fields() {
        let reading = SensorReading {
            device_id: "HP_1".to_string(),
            input_temp: None,
            output_temp: Some(21.3),
            flow: None,
            timestamp: Utc::now(),
        };
        assert_eq!(reading.present_fields(), 1);
    }
}
