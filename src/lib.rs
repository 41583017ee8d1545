//! Polls heat pump and ground pipe sensor boxes and power meters over Modbus
//! RTU tunnelled through TCP gateways, and stores what they report.

pub mod collectors;
pub mod constants;
pub mod data_mgmt;
pub mod helpers;
pub mod node_mgmt;
pub mod readers;
pub mod service;
