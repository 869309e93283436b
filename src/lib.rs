pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod types;

// Ports the pipeline depends on, and the adapters that implement them
pub mod app;
pub mod infra;
