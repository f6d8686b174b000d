//! Structural validation and quality scoring of normalized workouts.

use crate::{
    DurationStrategyResult, GeneratedWorkout, PhaseKind, QualityScores, Severity, ValidationError,
    ValidationResult, ValidationWarning, WorkoutRequestContext,
};
use std::collections::BTreeSet;

/// Allowed gap between the phase durations and the workout total
pub const TOTAL_DURATION_TOLERANCE_SECONDS: u32 = 300;

/// Allowed gap between a phase's duration and its exercises plus rest
pub const PHASE_DURATION_TOLERANCE_SECONDS: u32 = 60;

const ERROR_PENALTY: u32 = 20;
const WARNING_PENALTY: u32 = 5;

/// Equipment that never needs to be available
const NO_EQUIPMENT: &[&str] = &["none", "bodyweight", "body weight", "no equipment"];

/// Check a workout for missing structure and report softer inconsistencies
pub fn validate(workout: &GeneratedWorkout, context: &WorkoutRequestContext) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if workout.id.trim().is_empty() {
        errors.push(error("id", "Workout id is missing"));
    }
    if workout.title.trim().is_empty() {
        errors.push(error("title", "Workout title is missing"));
    }
    for (kind, phase) in workout.phases() {
        if phase.exercises.is_empty() {
            errors.push(error(
                kind.key(),
                &format!("{} phase is missing or has no exercises", kind.display_name()),
            ));
        }
    }

    let phase_sum = workout.phase_duration_sum();
    let total = workout.total_duration_seconds;
    if phase_sum.abs_diff(total) > TOTAL_DURATION_TOLERANCE_SECONDS {
        warnings.push(ValidationWarning {
            field: "totalDurationSeconds".into(),
            message: format!(
                "Phase durations add up to {}s but the workout is {}s",
                phase_sum, total
            ),
            recommendation: "Rebalance phase lengths to match the total".into(),
        });
    }

    for (kind, phase) in workout.phases() {
        if phase.exercises.is_empty() {
            continue;
        }
        let planned = phase.exercise_seconds_with_rest();
        if planned.abs_diff(phase.duration_seconds) >= PHASE_DURATION_TOLERANCE_SECONDS {
            warnings.push(ValidationWarning {
                field: format!("{}.durationSeconds", kind.key()),
                message: format!(
                    "{} is {}s but its exercises and rest take {}s",
                    kind.display_name(),
                    phase.duration_seconds,
                    planned
                ),
                recommendation: "Adjust exercise durations or rest to fit the phase".into(),
            });
        }
    }

    warnings.extend(unavailable_equipment(workout, context));

    let is_valid = errors.is_empty();
    let penalty = ERROR_PENALTY * errors.len() as u32 + WARNING_PENALTY * warnings.len() as u32;
    let score = 100u32.saturating_sub(penalty);

    tracing::info!(
        "Validated workout {}: valid={}, {} errors, {} warnings, score {}",
        workout.id,
        is_valid,
        errors.len(),
        warnings.len(),
        score
    );

    ValidationResult {
        is_valid,
        errors,
        warnings,
        score,
    }
}

fn error(field: &str, message: &str) -> ValidationError {
    ValidationError {
        field: field.into(),
        message: message.into(),
        severity: Severity::Error,
    }
}

/// One warning per exercise equipment item the user does not have
fn unavailable_equipment(
    workout: &GeneratedWorkout,
    context: &WorkoutRequestContext,
) -> Vec<ValidationWarning> {
    if context.equipment.is_empty() {
        return Vec::new();
    }
    let available: BTreeSet<String> = context
        .equipment
        .iter()
        .map(|e| e.trim().to_lowercase())
        .collect();

    let missing: BTreeSet<String> = workout
        .phases()
        .flat_map(|(_, phase)| phase.exercises.iter())
        .flat_map(|exercise| exercise.equipment.iter())
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .filter(|item| !NO_EQUIPMENT.contains(&item.as_str()))
        .filter(|item| !available.contains(item))
        .collect();

    missing
        .into_iter()
        .map(|item| ValidationWarning {
            field: "equipment".into(),
            message: format!("Exercise equipment '{}' is not available", item),
            recommendation: "Swap in a bodyweight or available-equipment alternative".into(),
        })
        .collect()
}

/// Structure, completeness and consistency scores, each 0-100
pub fn score_workout(
    workout: &GeneratedWorkout,
    duration_result: &DurationStrategyResult,
) -> QualityScores {
    let scores = QualityScores {
        structure_score: structure_score(workout),
        completeness_score: completeness_score(workout),
        consistency_score: consistency_score(workout, duration_result),
    };
    tracing::debug!("Scored workout {}: {:?}", workout.id, scores);
    scores
}

fn structure_score(workout: &GeneratedWorkout) -> u32 {
    let phases = workout
        .phases()
        .filter(|(_, phase)| !phase.exercises.is_empty())
        .count() as u32;
    let exercises = (workout.exercise_count() as u32 * 5).min(40);

    let mut metadata = 0;
    if !workout.title.trim().is_empty() {
        metadata += 5;
    }
    if !workout.description.trim().is_empty() {
        metadata += 5;
    }
    if !workout.reasoning.trim().is_empty() {
        metadata += 10;
    }
    if !workout.personalized_notes.is_empty() {
        metadata += 5;
    }
    if !workout.safety_reminders.is_empty() {
        metadata += 5;
    }

    phases * 10 + exercises + metadata
}

fn completeness_score(workout: &GeneratedWorkout) -> u32 {
    let required = [
        !workout.id.trim().is_empty(),
        !workout.title.trim().is_empty(),
        !workout.description.trim().is_empty(),
        !workout.phase(PhaseKind::Warmup).exercises.is_empty(),
        !workout.phase(PhaseKind::Main).exercises.is_empty(),
        !workout.phase(PhaseKind::Cooldown).exercises.is_empty(),
    ];
    let enhancements = [
        !workout.reasoning.trim().is_empty(),
        !workout.personalized_notes.is_empty(),
        !workout.progression_tips.is_empty(),
        !workout.safety_reminders.is_empty(),
    ];

    let fraction = |flags: &[bool]| flags.iter().filter(|f| **f).count() as f64 / flags.len() as f64;
    (fraction(&required) * 50.0 + fraction(&enhancements) * 50.0).round() as u32
}

fn consistency_score(workout: &GeneratedWorkout, duration_result: &DurationStrategyResult) -> u32 {
    let config = &duration_result.config;
    let mut score = 100u32;

    let drift = workout.phase_duration_sum().abs_diff(config.total_seconds());
    if drift > 300 {
        score -= 20;
    } else if drift > 120 {
        score -= 10;
    }

    let count_gap = (workout.exercise_count() as u32).abs_diff(config.exercise_count.total);
    if count_gap > 3 {
        score -= 15;
    } else if count_gap > 1 {
        score -= 5;
    }

    score
}
