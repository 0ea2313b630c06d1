//! ReelForge Common Utilities
//!
//! Shared infrastructure for all ReelForge crates:
//! - Error taxonomy and result alias
//! - Configuration loading and validation
//! - Retry-with-backoff for external provider calls
//! - Deadlines for external processes
//! - HTTP status classification for hosted providers
//! - Tracing/logging initialization

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod process;
pub mod retry;

pub use config::*;
pub use error::*;
pub use retry::*;
