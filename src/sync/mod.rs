//! Download pipeline: resolution, credentials, per-track downloads and reporting

pub mod credentials;
pub mod downloader;
pub mod engine;
pub mod events;
pub mod report;
pub mod resolver;

#[cfg(test)]
pub mod testing;

pub use downloader::RetryPolicy;
pub use engine::{Pipeline, PipelineRunner, RunRequest};
pub use events::{EventSink, PipelineEvent};
