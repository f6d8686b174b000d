//! Workout normalization: repair a parsed candidate into a complete workout.
//!
//! Processors run in a fixed order over the loosely-typed candidate tree,
//! each one seeing the previous one's output:
//! 1. [`MetadataProcessor`] - ids, title, timestamps, top-level arrays
//! 2. [`DurationProcessor`] - total and per-phase timing, phase structure
//! 3. [`ExerciseProcessor`] - per-exercise fields and defaults
//!
//! Every processor is idempotent. Issues and fixes are collected in a
//! [`NormalizationLog`] that is threaded through the run and returned with
//! the typed [`GeneratedWorkout`].

mod exercise;
mod metadata;
mod timing;

pub use exercise::ExerciseProcessor;
pub use metadata::MetadataProcessor;
pub use timing::DurationProcessor;

use crate::config::GenerationConfig;
use crate::schema::{self, ParsedCandidate};
use crate::{
    ComplexityTier, DurationStrategyResult, Exercise, FitnessLevel, GeneratedWorkout,
    MovementType, PhaseKind, WorkoutPhase,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Exercise length used when the model gives none
pub const DEFAULT_EXERCISE_SECONDS: u32 = 30;

/// Longest duration or rest accepted from a candidate
pub const MAX_DURATION_SECONDS: u32 = 4 * 60 * 60;

/// Accumulates what was wrong with a candidate and what was done about it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NormalizationLog {
    pub issues_found: Vec<String>,
    pub fixes_applied: Vec<String>,
}

impl NormalizationLog {
    pub fn issue(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Normalization issue: {}", message);
        self.issues_found.push(message);
    }

    pub fn fix(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Normalization fix: {}", message);
        self.fixes_applied.push(message);
    }

    /// Record a problem that was repaired in place
    pub fn repaired(&mut self, issue: impl Into<String>, fix: impl Into<String>) {
        self.issue(issue);
        self.fix(fix);
    }
}

/// Inputs shared by every processor in a run
#[derive(Clone, Copy, Debug)]
pub struct NormalizeContext<'a> {
    pub duration: &'a DurationStrategyResult,
    pub settings: &'a GenerationConfig,
}

impl NormalizeContext<'_> {
    pub fn minutes(&self) -> u32 {
        self.duration.adjusted_duration_minutes
    }
}

/// One repair stage over the candidate tree
pub trait Processor {
    fn name(&self) -> &'static str;

    fn process(
        &self,
        candidate: &mut ParsedCandidate,
        ctx: &NormalizeContext<'_>,
        log: &mut NormalizationLog,
    );
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NormalizationResult {
    pub workout: GeneratedWorkout,
    pub issues_found: Vec<String>,
    pub fixes_applied: Vec<String>,
}

/// Runs the processors in order and assembles the typed workout
pub struct WorkoutNormalizer {
    processors: Vec<Box<dyn Processor + Send + Sync>>,
    settings: GenerationConfig,
}

impl Default for WorkoutNormalizer {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

impl WorkoutNormalizer {
    pub fn new(settings: GenerationConfig) -> Self {
        Self {
            processors: vec![
                Box::new(MetadataProcessor),
                Box::new(DurationProcessor),
                Box::new(ExerciseProcessor),
            ],
            settings,
        }
    }

    pub fn normalize(
        &self,
        candidate: &ParsedCandidate,
        duration: &DurationStrategyResult,
    ) -> NormalizationResult {
        let ctx = NormalizeContext {
            duration,
            settings: &self.settings,
        };
        let mut tree = candidate.clone();
        let mut log = NormalizationLog::default();

        for processor in &self.processors {
            let before = log.fixes_applied.len();
            processor.process(&mut tree, &ctx, &mut log);
            tracing::debug!(
                "{} processor applied {} fixes",
                processor.name(),
                log.fixes_applied.len() - before
            );
        }

        let workout = assemble(&tree, &ctx);
        tracing::info!(
            "Normalized workout {}: {} issues, {} fixes, {} exercises",
            workout.id,
            log.issues_found.len(),
            log.fixes_applied.len(),
            workout.exercise_count()
        );

        NormalizationResult {
            workout,
            issues_found: log.issues_found,
            fixes_applied: log.fixes_applied,
        }
    }
}

/// Normalize with default generation settings
pub fn normalize_workout(
    candidate: &ParsedCandidate,
    duration: &DurationStrategyResult,
) -> NormalizationResult {
    WorkoutNormalizer::default().normalize(candidate, duration)
}

// ============================================================================
// Shared helpers
// ============================================================================

/// A duration read from the candidate, in seconds
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ResolvedSeconds {
    pub seconds: u32,
    /// The raw number when it was assumed to be minutes
    pub assumed_minutes: Option<f64>,
}

/// Read a duration value, applying the minutes-vs-seconds heuristic
///
/// A bare number in [1, 10] is taken to be minutes. This is a deliberate
/// approximation: a genuine 1-10 second duration cannot be told apart from
/// a mis-stated minute value. Strings that name hours, minutes or seconds
/// are converted explicitly. Results never land in [1, 10] so a second pass
/// leaves them alone, which makes an explicit "5 sec" unusable. Everything
/// is capped at [`MAX_DURATION_SECONDS`].
pub(crate) fn resolve_seconds(value: &Value) -> Option<ResolvedSeconds> {
    let n = schema::as_number(value)?;

    if let Value::String(s) = value {
        let unit = s
            .trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
            .trim_start()
            .to_lowercase();
        let factor = if unit.starts_with('h') {
            Some(3600.0)
        } else if unit.starts_with('m') {
            Some(60.0)
        } else if unit.starts_with('s') {
            Some(1.0)
        } else {
            None
        };
        if let Some(factor) = factor {
            let seconds = (n * factor).round();
            return (seconds > 10.0).then(|| ResolvedSeconds {
                seconds: capped(seconds),
                assumed_minutes: None,
            });
        }
    }

    if (1.0..=10.0).contains(&n) {
        Some(ResolvedSeconds {
            seconds: (n * 60.0).round() as u32,
            assumed_minutes: Some(n),
        })
    } else if n > 10.0 {
        Some(ResolvedSeconds {
            seconds: capped(n.ceil()),
            assumed_minutes: None,
        })
    } else {
        None
    }
}

fn capped(seconds: f64) -> u32 {
    seconds.min(f64::from(MAX_DURATION_SECONDS)) as u32
}

/// Coerce a value into an array of non-empty strings
///
/// Returns the array and, when the input was not already clean, a note
/// describing what changed.
pub(crate) fn coerce_string_array(value: Option<Value>) -> (Value, Option<&'static str>) {
    match value {
        None | Some(Value::Null) => (Value::Array(vec![]), Some("defaulted to empty array")),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                (Value::Array(vec![]), Some("replaced empty string with empty array"))
            } else {
                (
                    Value::Array(vec![Value::String(s.to_string())]),
                    Some("wrapped single value in array"),
                )
            }
        }
        Some(Value::Array(items)) => {
            let original_len = items.len();
            let mut changed = false;
            let cleaned: Vec<Value> = items
                .into_iter()
                .filter_map(|item| {
                    let text = match &item {
                        Value::String(s) => {
                            let trimmed = s.trim();
                            if trimmed.len() != s.len() {
                                changed = true;
                            }
                            Some(trimmed.to_string())
                        }
                        Value::Number(n) => Some(n.to_string()),
                        Value::Bool(b) => Some(b.to_string()),
                        Value::Object(o) => o.get("name").and_then(schema::as_text).map(String::from),
                        _ => None,
                    };
                    if !matches!(item, Value::String(_)) {
                        changed = true;
                    }
                    text.filter(|t| !t.is_empty()).map(Value::String)
                })
                .collect();
            let note = (changed || cleaned.len() != original_len)
                .then_some("removed malformed array entries");
            (Value::Array(cleaned), note)
        }
        Some(_) => (Value::Array(vec![]), Some("replaced non-array value with empty array")),
    }
}

/// Difficulty implied by how complex the selected duration is
pub(crate) fn difficulty_for_tier(tier: ComplexityTier) -> FitnessLevel {
    match tier {
        ComplexityTier::Minimal | ComplexityTier::Basic => FitnessLevel::NewToExercise,
        ComplexityTier::Moderate => FitnessLevel::SomeExperience,
        ComplexityTier::Advanced | ComplexityTier::Comprehensive => FitnessLevel::AdvancedAthlete,
    }
}

// ============================================================================
// Assembly
// ============================================================================

fn text(map: &Map<String, Value>, key: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_string()
}

fn strings(map: &Map<String, Value>, key: &str) -> Vec<String> {
    map.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn uint(map: &Map<String, Value>, key: &str, default: u32) -> u32 {
    map.get(key)
        .and_then(Value::as_f64)
        .filter(|n| *n >= 0.0)
        .map(|n| n.round() as u32)
        .unwrap_or(default)
}

/// Build the typed workout from a fully processed tree
fn assemble(tree: &ParsedCandidate, ctx: &NormalizeContext<'_>) -> GeneratedWorkout {
    let empty = Map::new();
    let phase = |kind: PhaseKind| {
        let map = tree
            .get(kind.key())
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        assemble_phase(kind, map)
    };

    GeneratedWorkout {
        id: text(tree, schema::ID),
        title: text(tree, schema::TITLE),
        description: text(tree, schema::DESCRIPTION),
        total_duration_seconds: ctx.minutes() * 60,
        estimated_calories: uint(tree, schema::ESTIMATED_CALORIES, ctx.minutes() * 8),
        difficulty: tree
            .get(schema::DIFFICULTY)
            .and_then(Value::as_str)
            .and_then(FitnessLevel::parse)
            .unwrap_or_else(|| difficulty_for_tier(ctx.duration.config.complexity_tier)),
        equipment: strings(tree, schema::EQUIPMENT),
        warmup: phase(PhaseKind::Warmup),
        main_workout: phase(PhaseKind::Main),
        cooldown: phase(PhaseKind::Cooldown),
        reasoning: text(tree, schema::REASONING),
        personalized_notes: strings(tree, "personalizedNotes"),
        progression_tips: strings(tree, "progressionTips"),
        safety_reminders: strings(tree, "safetyReminders"),
        generated_at_timestamp: tree
            .get(schema::GENERATED_AT)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now),
        ai_model: text(tree, schema::AI_MODEL),
        confidence: tree
            .get(schema::CONFIDENCE)
            .and_then(Value::as_f64)
            .unwrap_or(ctx.settings.default_confidence),
        tags: strings(tree, "tags"),
    }
}

fn assemble_phase(kind: PhaseKind, map: &Map<String, Value>) -> WorkoutPhase {
    let exercises = map
        .get(schema::EXERCISES)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(assemble_exercise)
                .collect()
        })
        .unwrap_or_default();

    let name = match text(map, schema::NAME) {
        n if n.is_empty() => kind.display_name().to_string(),
        n => n,
    };

    WorkoutPhase {
        name,
        duration_seconds: uint(map, schema::DURATION, 0),
        exercises,
        instructions: text(map, schema::INSTRUCTIONS),
        tips: strings(map, schema::TIPS),
    }
}

fn assemble_exercise(map: &Map<String, Value>) -> Exercise {
    Exercise {
        id: text(map, schema::ID),
        name: text(map, schema::NAME),
        description: text(map, schema::DESCRIPTION),
        duration_seconds: uint(map, schema::DURATION, DEFAULT_EXERCISE_SECONDS),
        sets: uint(map, schema::SETS, 1).max(1),
        reps: uint(map, schema::REPS, 10).max(1),
        rest_time_seconds: uint(map, schema::REST, 30),
        equipment: strings(map, "equipment"),
        form: text(map, schema::FORM),
        modifications: strings(map, "modifications"),
        common_mistakes: strings(map, "commonMistakes"),
        primary_muscles: strings(map, "primaryMuscles"),
        secondary_muscles: strings(map, "secondaryMuscles"),
        movement_type: map
            .get(schema::MOVEMENT_TYPE)
            .and_then(Value::as_str)
            .and_then(MovementType::parse)
            .unwrap_or_default(),
        personalized_notes: strings(map, "personalizedNotes"),
        difficulty_adjustments: strings(map, "difficultyAdjustments"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_response;
    use crate::{select_duration_strategy, WorkoutRequestContext};
    use serde_json::json;

    fn duration(minutes: u32) -> DurationStrategyResult {
        select_duration_strategy(&WorkoutRequestContext::new(minutes))
    }

    fn obj(value: Value) -> ParsedCandidate {
        value.as_object().cloned().unwrap()
    }

    fn renormalize(result: &NormalizationResult, d: &DurationStrategyResult) -> NormalizationResult {
        let tree = obj(serde_json::to_value(&result.workout).unwrap());
        normalize_workout(&tree, d)
    }

    #[test]
    fn test_resolve_seconds_heuristic() {
        assert_eq!(resolve_seconds(&json!(1)).unwrap().seconds, 60);
        assert_eq!(resolve_seconds(&json!(10)).unwrap().seconds, 600);
        assert_eq!(resolve_seconds(&json!(1.5)).unwrap().seconds, 90);
        assert_eq!(resolve_seconds(&json!(45)).unwrap(), ResolvedSeconds {
            seconds: 45,
            assumed_minutes: None
        });
        assert_eq!(resolve_seconds(&json!(10.2)).unwrap().seconds, 11);
        assert!(resolve_seconds(&json!(0)).is_none());
        assert!(resolve_seconds(&json!(0.5)).is_none());
        assert!(resolve_seconds(&json!(-5)).is_none());
    }

    #[test]
    fn test_resolve_seconds_explicit_units() {
        let r = resolve_seconds(&json!("2 minutes")).unwrap();
        assert_eq!(r.seconds, 120);
        assert!(r.assumed_minutes.is_none());
        assert_eq!(resolve_seconds(&json!("45 sec")).unwrap().seconds, 45);
        assert!(resolve_seconds(&json!("0.1 min")).is_none());
        assert_eq!(resolve_seconds(&json!("1.5 hours")).unwrap().seconds, 5400);
    }

    #[test]
    fn test_explicit_seconds_skip_minutes_heuristic() {
        let r = resolve_seconds(&json!("30s")).unwrap();
        assert_eq!(r.seconds, 30);
        assert!(r.assumed_minutes.is_none());
        assert!(resolve_seconds(&json!("5 sec")).is_none());
        assert!(resolve_seconds(&json!("10 seconds")).is_none());
    }

    #[test]
    fn test_huge_durations_are_capped() {
        let r = resolve_seconds(&json!(1e10)).unwrap();
        assert_eq!(r.seconds, MAX_DURATION_SECONDS);
        assert_eq!(
            resolve_seconds(&json!("999999 minutes")).unwrap().seconds,
            MAX_DURATION_SECONDS
        );
    }

    #[test]
    fn test_explicit_short_seconds_default_instead_of_minutes() {
        let d = duration(20);
        let tree = obj(json!({
            "mainWorkout": {"exercises": [{"name": "Hold", "duration": "5 sec"}]}
        }));
        let result = normalize_workout(&tree, &d);
        assert_eq!(
            result.workout.main_workout.exercises[0].duration_seconds,
            DEFAULT_EXERCISE_SECONDS
        );
    }

    #[test]
    fn test_coerce_string_array() {
        let (v, note) = coerce_string_array(Some(json!(["a", " b ", 3, null, {"name": "c"}])));
        assert_eq!(v, json!(["a", "b", "3", "c"]));
        assert!(note.is_some());

        let (v, note) = coerce_string_array(Some(json!(["a", "b"])));
        assert_eq!(v, json!(["a", "b"]));
        assert!(note.is_none());

        let (v, _) = coerce_string_array(Some(json!("dumbbells")));
        assert_eq!(v, json!(["dumbbells"]));

        let (v, note) = coerce_string_array(None);
        assert_eq!(v, json!([]));
        assert!(note.is_some());
    }

    #[test]
    fn test_fenced_example_converts_minutes() {
        let raw = "Sure! ```json\n{\"id\":\"w1\",\"title\":\"T\",\"warmup\":{\"exercises\":[{\"name\":\"A\",\"duration\":1}]},\"mainWorkout\":{\"exercises\":[]},\"cooldown\":{\"exercises\":[]}}\n```";
        let parsed = parse_response(&raw.into());
        let d = duration(20);

        let result = normalize_workout(&parsed.data, &d);

        assert_eq!(result.workout.warmup.exercises[0].duration_seconds, 60);
        assert!(result
            .fixes_applied
            .iter()
            .any(|f| f.contains("warmup") && f.contains("60")));
        assert_eq!(result.workout.id, "w1");
        assert_eq!(result.workout.title, "T");
    }

    #[test]
    fn test_total_duration_is_always_derived() {
        for minutes in [5, 10, 15, 20, 30, 45] {
            let d = duration(minutes);
            let tree = obj(json!({"totalDuration": 999, "title": "X"}));
            let result = normalize_workout(&tree, &d);
            assert_eq!(result.workout.total_duration_seconds, minutes * 60);
        }
    }

    #[test]
    fn test_phase_durations_come_from_allocation() {
        let d = duration(20);
        let tree = obj(json!({
            "warmup": {"duration": 999, "exercises": [{"name": "Jog", "duration": 120}]},
            "mainWorkout": {"duration": 5, "exercises": [{"name": "Squat", "duration": 600}]},
            "cooldown": {"exercises": [{"name": "Stretch", "duration": 180}]}
        }));

        let result = normalize_workout(&tree, &d);

        assert_eq!(result.workout.warmup.duration_seconds, 180);
        assert_eq!(result.workout.main_workout.duration_seconds, 840);
        assert_eq!(result.workout.cooldown.duration_seconds, 180);
        assert!(result
            .issues_found
            .iter()
            .any(|i| i.contains("mainWorkout duration 5 looks like minutes")));
    }

    #[test]
    fn test_empty_candidate_gets_complete_skeleton() {
        let d = duration(30);
        let result = normalize_workout(&ParsedCandidate::new(), &d);
        let w = &result.workout;

        assert!(w.id.starts_with("workout-"));
        assert_eq!(w.title, "30-Minute AI Workout");
        assert!(!w.description.is_empty());
        assert_eq!(w.confidence, 0.8);
        assert_eq!(w.total_duration_seconds, 1800);
        assert_eq!(w.estimated_calories, 240);
        assert_eq!(w.difficulty, FitnessLevel::AdvancedAthlete);
        assert_eq!(w.warmup.name, "Warm-up");
        assert!(w.main_workout.exercises.is_empty());
        assert!(result.issues_found.iter().any(|i| i.contains("missing mainWorkout")));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = "Sure! ```json\n{\"id\":\"w1\",\"title\":\"Workout\",\"warmup\":{\"exercises\":[{\"name\":\"A\",\"duration\":1,\"equipment\":\"mat\"}]},\"main\":[{\"name\":\"B\",\"repetitions\":\"12-15\",\"restTime\":\"45s\",\"duration\":\"2 minutes\"}],\"cooldown\":{\"exercises\":[\"Child pose\"]},\"confidence\":85,\"difficulty\":\"beginner\"}\n```";
        let d = duration(15);
        let first = normalize_workout(&parse_response(&raw.into()).data, &d);
        assert!(!first.fixes_applied.is_empty());

        let second = renormalize(&first, &d);

        assert_eq!(
            serde_json::to_string(&first.workout).unwrap(),
            serde_json::to_string(&second.workout).unwrap()
        );
        assert!(
            second.fixes_applied.is_empty(),
            "unexpected fixes: {:?}",
            second.fixes_applied
        );
    }

    #[test]
    fn test_synthesized_candidate_is_idempotent() {
        let d = duration(45);
        let parsed = parse_response(&"Do 10 push ups\nand 20 squats".into());
        let first = normalize_workout(&parsed.data, &d);
        let second = renormalize(&first, &d);
        assert_eq!(first.workout, second.workout);
    }
}
