//! End-to-end processing of one LLM response.
//!
//! Runs duration selection, parsing, normalization, validation and scoring
//! in order. Every stage produces a best-effort value, so this never fails.

use crate::config::GenerationConfig;
use crate::normalize::WorkoutNormalizer;
use crate::parser::{parse_response, LlmResponse, ParseStrategy, ResponseDiagnostics};
use crate::strategy::select_duration_strategy;
use crate::validation::{score_workout, validate};
use crate::{
    DurationStrategyResult, GeneratedWorkout, QualityScores, ValidationResult,
    WorkoutRequestContext,
};
use serde::{Deserialize, Serialize};

/// Everything the pipeline learned about a response
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub duration: DurationStrategyResult,
    pub parse_success: bool,
    pub parse_strategy: ParseStrategy,
    pub parse_issues: Vec<String>,
    pub diagnostics: ResponseDiagnostics,
    pub workout: GeneratedWorkout,
    pub issues_found: Vec<String>,
    pub fixes_applied: Vec<String>,
    pub validation: ValidationResult,
    pub scores: QualityScores,
}

/// Turn a raw response into a validated, scored workout for `context`
pub fn process_response(
    context: &WorkoutRequestContext,
    response: &LlmResponse,
    settings: &GenerationConfig,
) -> PipelineReport {
    let duration = select_duration_strategy(context);
    let parsed = parse_response(response);
    let normalized = WorkoutNormalizer::new(settings.clone()).normalize(&parsed.data, &duration);
    let validation = validate(&normalized.workout, context);
    let scores = score_workout(&normalized.workout, &duration);

    tracing::info!(
        "Processed response via {}: {} minutes, valid={}, score {}",
        parsed.strategy_used,
        duration.adjusted_duration_minutes,
        validation.is_valid,
        validation.score
    );

    PipelineReport {
        duration,
        parse_success: parsed.success,
        parse_strategy: parsed.strategy_used,
        parse_issues: parsed.issues,
        diagnostics: parsed.diagnostics,
        workout: normalized.workout,
        issues_found: normalized.issues_found,
        fixes_applied: normalized.fixes_applied,
        validation,
        scores,
    }
}
