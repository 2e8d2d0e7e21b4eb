//! Infrastructure layer: config, logging and the fixture-backed adapters.

pub mod config;
pub mod contracts;
pub mod error;
pub mod logging;
pub mod replay;
