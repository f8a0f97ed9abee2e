//! Library side of the `hemoprod` binary: configuration, logging and the
//! per-source driver.

pub mod config;
pub mod logging;
pub mod pipeline;
pub mod types;
