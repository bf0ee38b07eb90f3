//! # mentora-core
//!
//! Core types, traits, and abstractions for the mentora backend.
//!
//! This crate provides:
//! - The shared [`Error`]/[`Result`] types
//! - Domain and queue models
//! - Repository and capability-backend traits (the dependency-injection
//!   seams for workers and the API layer)
//! - Centralized default constants and logging field names

pub mod defaults;
pub mod error;
pub mod ids;
pub mod logging;
pub mod models;
pub mod traits;

pub use error::{Error, Result};
pub use ids::{new_certificate_id, new_v7};
pub use models::*;
pub use traits::*;
