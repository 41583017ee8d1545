//! Register map of the sensor boxes and power meters

use serde::Serialize;

use crate::data_mgmt::process::EnergyEncoding;

/// A holding register block read in one transaction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    pub address: u16,
    pub count: u16,
}

/// Temperature sensors answer with three registers; the first is the temperature
pub const TEMPERATURE: RegisterBlock = RegisterBlock {
    address: 0x0001,
    count: 3,
};
pub const TEMPERATURE_INDEX: usize = 0;

/// 32-bit flow value, low word first
pub const FLOW: RegisterBlock = RegisterBlock {
    address: 0x0022,
    count: 2,
};

pub const DEFAULT_ENERGY_REGISTER: u16 = 0x0404;
pub const ENERGY_REGISTER_COUNT: u16 = 2;

/// Where and how a power meter exposes its cumulative energy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EnergyProfile {
    pub encoding: EnergyEncoding,
    pub register: u16,
}

impl EnergyProfile {
    pub fn block(&self) -> RegisterBlock {
        RegisterBlock {
            address: self.register,
            count: ENERGY_REGISTER_COUNT,
        }
    }
}
