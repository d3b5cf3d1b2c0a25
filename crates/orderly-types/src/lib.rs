//! Common types module for the Orderly platform.
//!
//! This module defines the core data types and structures shared by all
//! platform components. It provides a centralized location for the order
//! state enumeration, role views, the order record itself, and supporting
//! machinery so that every crate agrees on a single vocabulary.

/// Order record, state enumeration, and line-item types.
pub mod order;
/// Actor role views (admin, restaurant, rider).
pub mod role;
/// Storage key types for persisted collections.
pub mod storage;
/// Display formatting helpers (elapsed time, currency).
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

/// Registry trait for self-registering implementations.
pub mod registry;

// Re-export all types for convenient access
pub use order::*;
pub use registry::*;
pub use role::*;
pub use storage::*;
pub use utils::{elapsed_time, format_currency};
pub use validation::*;
