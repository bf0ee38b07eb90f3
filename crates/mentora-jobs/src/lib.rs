//! # mentora-jobs
//!
//! Background job worker runtime for mentora.
//!
//! This crate provides:
//! - Typed job payloads validated at dequeue time
//! - The [`JobHandler`] trait and execution context
//! - [`JobWorker`]: per-queue claim loops with concurrent leases, broadcast
//!   events, and graceful shutdown
//! - The content-generation and grading handlers
//!
//! ## Example
//!
//! ```ignore
//! use mentora_jobs::{ContentHandler, GradingHandler, WorkerBuilder, WorkerConfig};
//!
//! let worker = WorkerBuilder::new(jobs)
//!     .with_config(WorkerConfig::from_env())
//!     .with_handler(ContentHandler::new(chapters, generator.clone(), video))
//!     .with_handler(GradingHandler::new(proofs, grading, generator, fetcher))
//!     .build();
//!
//! let handle = worker.start();
//! // ... on shutdown signal:
//! handle.shutdown().await;
//! ```

pub mod content;
pub mod grading;
pub mod handler;
pub mod payload;
pub mod prompts;
pub mod verdict;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use content::ContentHandler;
pub use grading::GradingHandler;
pub use handler::{JobContext, JobHandler, JobResult, NoOpHandler};
pub use payload::{ContentJobPayload, GradingJobPayload, JobPayload};
pub use verdict::parse_verdict;
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};
