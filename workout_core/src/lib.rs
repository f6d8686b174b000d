#![forbid(unsafe_code)]

//! Core domain model and processing pipeline for LLM-generated workouts.
//!
//! This crate provides:
//! - Domain types (duration configs, request context, workouts, validation)
//! - The canonical duration catalog and duration strategy
//! - Response parsing with a fallback chain ending in text synthesis
//! - Normalization of parsed candidates into complete workouts
//! - Validation and quality scoring

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod schema;
pub mod parser;
pub mod synthesis;
pub mod normalize;
pub mod strategy;
pub mod validation;
pub mod pipeline;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, DurationCatalog};
pub use config::{Config, GenerationConfig, ProfileConfig};
pub use parser::{parse_response, LlmResponse, ParseResult, ParseStrategy};
pub use normalize::{normalize_workout, NormalizationResult, WorkoutNormalizer};
pub use strategy::select_duration_strategy;
pub use validation::{score_workout, validate};
pub use pipeline::{process_response, PipelineReport};
