//! Key names and lenient accessors for the loosely-typed candidate tree.
//!
//! LLM output arrives as a `serde_json` object with no guarantees. The
//! parser and the normalizer both need to find fields under the names the
//! model tends to use, so the alias tables live here.

use crate::PhaseKind;
use serde_json::{Map, Value};

/// Parsed but not yet normalized workout tree
pub type ParsedCandidate = Map<String, Value>;

pub const ID: &str = "id";
pub const TITLE: &str = "title";
pub const DESCRIPTION: &str = "description";
pub const TOTAL_DURATION: &str = "totalDurationSeconds";
pub const TOTAL_DURATION_ALIASES: &[&str] = &[
    "totalDuration",
    "total_duration",
    "total_duration_seconds",
    "durationSeconds",
    "duration",
];
pub const GENERATED_AT: &str = "generatedAtTimestamp";
pub const GENERATED_AT_ALIASES: &[&str] = &["generatedAt", "generated_at", "timestamp"];
pub const AI_MODEL: &str = "aiModel";
pub const AI_MODEL_ALIASES: &[&str] = &["ai_model", "model"];
pub const CONFIDENCE: &str = "confidence";
pub const DIFFICULTY: &str = "difficulty";
pub const ESTIMATED_CALORIES: &str = "estimatedCalories";
pub const ESTIMATED_CALORIES_ALIASES: &[&str] = &["estimated_calories", "calories"];
pub const REASONING: &str = "reasoning";
pub const EQUIPMENT: &str = "equipment";

/// Top-level string-array fields with their snake_case aliases
pub const WORKOUT_ARRAY_FIELDS: &[(&str, &[&str])] = &[
    ("equipment", &[]),
    ("personalizedNotes", &["personalized_notes"]),
    ("progressionTips", &["progression_tips"]),
    ("safetyReminders", &["safety_reminders"]),
    ("tags", &[]),
];

// Phase fields
pub const EXERCISES: &str = "exercises";
pub const NAME: &str = "name";
pub const DURATION: &str = "durationSeconds";
pub const DURATION_ALIASES: &[&str] = &["duration", "duration_seconds", "time"];
pub const INSTRUCTIONS: &str = "instructions";
pub const TIPS: &str = "tips";

// Exercise fields
pub const SETS: &str = "sets";
pub const REPS: &str = "reps";
pub const REPS_ALIASES: &[&str] = &["repetitions"];
pub const REST: &str = "restTimeSeconds";
pub const REST_ALIASES: &[&str] = &["restTime", "rest", "restSeconds", "rest_seconds", "rest_time"];
pub const FORM: &str = "form";
pub const MOVEMENT_TYPE: &str = "movementType";
pub const MOVEMENT_TYPE_ALIASES: &[&str] = &["movement_type", "type"];

/// Exercise string-array fields with their snake_case aliases
pub const EXERCISE_ARRAY_FIELDS: &[(&str, &[&str])] = &[
    ("equipment", &[]),
    ("modifications", &[]),
    ("commonMistakes", &["common_mistakes"]),
    ("primaryMuscles", &["primary_muscles"]),
    ("secondaryMuscles", &["secondary_muscles"]),
    ("personalizedNotes", &["personalized_notes"]),
    ("difficultyAdjustments", &["difficulty_adjustments"]),
];

/// Alternative keys a model may use for a phase
pub const fn phase_aliases(kind: PhaseKind) -> &'static [&'static str] {
    match kind {
        PhaseKind::Warmup => &["warmUp", "warm_up", "Warmup"],
        PhaseKind::Main => &["main", "main_workout", "mainworkout", "workout"],
        PhaseKind::Cooldown => &["coolDown", "cool_down", "Cooldown"],
    }
}

/// Look up a field under its canonical name or any alias
pub fn find<'a>(map: &'a Map<String, Value>, canonical: &str, aliases: &[&str]) -> Option<&'a Value> {
    std::iter::once(canonical)
        .chain(aliases.iter().copied())
        .find_map(|key| map.get(key))
}

/// Remove a field and all of its aliases, returning the first value found
///
/// The canonical name takes priority over aliases.
pub fn take(map: &mut Map<String, Value>, canonical: &str, aliases: &[&str]) -> Option<Value> {
    let mut found = map.remove(canonical);
    for alias in aliases {
        if let Some(value) = map.remove(*alias) {
            if found.is_none() {
                found = Some(value);
            }
        }
    }
    found
}

/// Non-blank string value, trimmed
pub fn as_text(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Numeric value, accepting numbers and numeric strings
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// First number at the start of a string ("10-12 reps" -> 10)
pub fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let end = s
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || (*c == '.' && *i > 0)))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[..end].trim_end_matches('.').parse().ok()
}

/// How workout-shaped an object looks
///
/// Scores id +10, title +10, each phase +20, total duration +10 and a
/// top-level exercises array +5.
pub fn workout_shape_score(map: &Map<String, Value>) -> u32 {
    let mut score = 0;
    if map.contains_key(ID) {
        score += 10;
    }
    if map.contains_key(TITLE) {
        score += 10;
    }
    for kind in PhaseKind::ALL {
        if find(map, kind.key(), phase_aliases(kind)).is_some() {
            score += 20;
        }
    }
    if find(map, TOTAL_DURATION, &["totalDuration", "total_duration"]).is_some() {
        score += 10;
    }
    if map.get(EXERCISES).is_some_and(Value::is_array) {
        score += 5;
    }
    score
}
