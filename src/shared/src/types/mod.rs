//! Shared type definitions for the DB-IMPACT Platform
//!
//! This module provides the type definitions used across the platform,
//! ensuring consistency between the impact engine and its consumers.

pub mod api;
pub mod core;

// Re-export core types
pub use self::core::{DatabaseConfig, ImpactResult, Severity};

// Re-export API types
pub use self::api::{
    AnalysisRequest, BatchAnalysisRequest, BatchItem, BatchOutcome, BatchResult,
    ImprovementSummary, ScenarioSummary, WhatIfRequest, WhatIfResult,
};
