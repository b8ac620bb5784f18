//! HTTP request handlers.
//!
//! - [`uploads`]: the upload relay endpoint and its method fallback
//! - [`health`]: liveness probe

pub mod health;
pub mod uploads;
