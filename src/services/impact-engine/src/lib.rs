//! Impact Engine Service Library
//!
//! Core functionality for simulating the business impact of hypothetical
//! database failures: configuration resolution, prompt assembly, reasoning
//! service invocation, batch fan-out and what-if differential analysis.

pub mod analyzer;
pub mod batch;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod prompt;
pub mod reasoner;
pub mod resolver;
pub mod scenarios;
pub mod telemetry;
pub mod what_if;

pub use analyzer::AnalysisEngine;
pub use batch::BatchAnalyzer;
pub use cache::{CacheKey, ResultCache};
pub use config::Config;
pub use context::BusinessContextStore;
pub use error::{AppError, Result};
pub use reasoner::{Reasoner, ReasoningClient};
pub use resolver::ConfigResolver;
pub use scenarios::ScenarioRegistry;
pub use telemetry::{MetricsTelemetry, NoopTelemetry, TelemetrySink};
pub use what_if::WhatIfEngine;
