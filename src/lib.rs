//! Ingest/fan-out pipeline for heterogeneous sensor telemetry: parses line-oriented
//! key/value records, indexes them into a hierarchical aggregation tree, feeds per-type
//! analyzers, forwards them to an isolated actor subsystem, and notifies observers.

pub mod actor;
pub mod analyzer;
pub mod composite;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod observer;
pub mod parser;
pub mod pool;
pub mod record;
pub mod registry;
pub mod sinks;
pub mod stream_queue;
pub mod visitor;

pub use errors::{Result, SensorPipelineError};
