//! API endpoint implementations for the Orderly service.

pub mod orders;
