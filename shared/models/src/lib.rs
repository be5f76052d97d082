//! Shared data types for the PanelHub billing pages.

pub mod billing;

pub use billing::*;
