pub mod models;
pub mod persistence;
pub mod process;
