//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`retry`] - Retry with exponential backoff for read-only calls
//! - [`timing`] - Duration logging around async operations

pub mod retry;
pub mod timing;
