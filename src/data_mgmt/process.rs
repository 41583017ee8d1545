//! Register codec
//!
//! Pure conversions from raw 16-bit holding registers to engineering values.
//! All results are rounded to two decimals. A conversion given fewer registers
//! than it needs fails instead of producing a partial value.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw temperature units per °C
pub const TEMPERATURE_SCALE: f64 = 0.1;
/// Raw flow units per L/min
pub const FLOW_SCALE: f64 = 0.01;
/// Raw energy units per kWh, for the scaled integer encoding
pub const ENERGY_SCALE: f64 = 0.01;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("insufficient registers: need {needed}, got {got}")]
    InsufficientRegisters { needed: usize, got: usize },
    #[error("energy value is not a finite number: {0}")]
    NotFinite(f32),
}

/// How a power meter lays out its 32-bit cumulative energy value
///
/// Both layouts exist among deployed meters and nothing on the wire tells them
/// apart, so each deployment declares which one applies.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EnergyEncoding {
    /// IEEE-754 float, high word first, kWh
    Float32,
    /// Unsigned integer, high word first, 0.01 kWh per unit
    ScaledU32,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn require(registers: &[u16], needed: usize) -> Result<(), DecodeError> {
    if registers.len() < needed {
        return Err(DecodeError::InsufficientRegisters {
            needed,
            got: registers.len(),
        });
    }
    Ok(())
}

/// Decode the signed temperature at `index` of a temperature read, in °C
pub fn decode_temperature(registers: &[u16], index: usize) -> Result<f64, DecodeError> {
    require(registers, index + 1)?;
    // Two's complement: 0x8000 and above are negative
    let raw = registers[index] as i16;
    Ok(round2(raw as f64 * TEMPERATURE_SCALE))
}

/// Decode a flow rate in L/min
///
/// The flow sensor sends its low word first: the value is
/// `(registers[1] << 16) | registers[0]`.
pub fn decode_flow(registers: &[u16]) -> Result<f64, DecodeError> {
    require(registers, 2)?;
    let raw = ((registers[1] as u32) << 16) | registers[0] as u32;
    Ok(round2(raw as f64 * FLOW_SCALE))
}

/// Decode a cumulative energy value in kWh
pub fn decode_energy(registers: &[u16], encoding: EnergyEncoding) -> Result<f64, DecodeError> {
    require(registers, 2)?;
    let (high, low) = (registers[0], registers[1]);
    match encoding {
        EnergyEncoding::Float32 => {
            let [h0, h1] = high.to_be_bytes();
            let [l0, l1] = low.to_be_bytes();
            let value = f32::from_be_bytes([h0, h1, l0, l1]);
            if !value.is_finite() {
                return Err(DecodeError::NotFinite(value));
            }
            if value < 0.0 {
                log::warn!("Negative energy value {} kWh clamped to 0.0", value);
                return Ok(0.0);
            }
            Ok(round2(value as f64))
        }
        EnergyEncoding::ScaledU32 => {
            let raw = ((high as u32) << 16) | low as u32;
            Ok(round2(raw as f64 * ENERGY_SCALE))
        }
    }
}

/// Register value a temperature sensor reports for `celsius`
pub fn encode_temperature(celsius: f64) -> u16 {
    (celsius / TEMPERATURE_SCALE).round() as i16 as u16
}

/// Registers a flow sensor reports for `lpm`, low word first
pub fn encode_flow(lpm: f64) -> [u16; 2] {
    let raw = (lpm / FLOW_SCALE).round() as u32;
    [(raw & 0xFFFF) as u16, (raw >> 16) as u16]
}

/// Registers a power meter reports for `kwh` under `encoding`
pub fn encode_energy(kwh: f64, encoding: EnergyEncoding) -> [u16; 2] {
    let bits = match encoding {
        EnergyEncoding::Float32 => (kwh as f32).to_bits(),
        EnergyEncoding::ScaledU32 => (kwh / ENERGY_SCALE).round() as u32,
    };
    [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
}
