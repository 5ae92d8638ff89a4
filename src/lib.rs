pub mod config;
pub mod constants;
pub mod error;
pub mod ladder;
pub mod logging;
pub mod model;
pub mod runtime;
pub mod status;
