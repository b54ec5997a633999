pub mod cleaner;
pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use error::{EtlError, Result};
pub use pipeline::{Pipeline, PipelineInputs, PipelineReport};
