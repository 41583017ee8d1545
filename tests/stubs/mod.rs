#![allow(dead_code)]
// Each integration test binary pulls in the stubs it needs; the rest would
// otherwise warn as unused

pub mod config;
pub mod fake_bus;
pub mod recording_sink;
pub mod rtu_responder;
