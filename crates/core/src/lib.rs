//! Core types and configuration for the vrdrive system.
//!
//! This crate provides shared types used across all other crates:
//! - Trajectory and VR recording types
//! - Trial metadata and the aligned trial output
//! - Scenario parameter tables and processing settings
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{AlignerConfig, Config, ExperimentParams, PipelineConfig, ScenarioConfig};
pub use error::{Error, ErrorKind, Result};
pub use types::*;
