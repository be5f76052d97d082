//! PanelHub Observability Library
//!
//! Provides unified logging infrastructure for the billing crates.
//!
//! # Features
//! - Structured JSON or pretty logging with consistent schema
//! - Domain event logging for orders, subscriptions and catalog lookups
//! - Small macros for timing, repository and rule logging

pub mod domain_events;
pub mod init;
pub mod macros;

pub use domain_events::*;
pub use init::*;

// Re-export tracing for convenience
pub use tracing::{debug, error, info, instrument, trace, warn};
