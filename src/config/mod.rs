//! # sampledb Configuration Module
//!
//! Centralizes the layout and tuning constants. Runtime options (open mode,
//! caller header size, initial capacity, search strategy) are set through
//! [`crate::SampleDbBuilder`] instead.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
