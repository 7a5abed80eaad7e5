//! Shared types for the DB-IMPACT Platform

pub mod types;

// Export all types from types module
pub use types::*;
