//! # mentora-inference
//!
//! External capability clients for mentora: text generation (Gemini),
//! video search (YouTube), and raw-content fetching for grading evidence.
//!
//! Each client implements the corresponding trait from `mentora-core`, so
//! workers receive them as injected `Arc<dyn …>` dependencies and tests can
//! substitute the deterministic [`mock`] backends.

pub mod gemini;
pub mod github;
pub mod mock;
pub mod youtube;

pub use gemini::GeminiBackend;
pub use github::{probe_plan, CodeEvidenceFetcher, HttpRawFetcher};
pub use youtube::YouTubeSearchBackend;
