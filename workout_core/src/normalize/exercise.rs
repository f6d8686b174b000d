//! Per-exercise repair.

use super::{
    coerce_string_array, resolve_seconds, NormalizationLog, NormalizeContext, Processor,
    DEFAULT_EXERCISE_SECONDS, MAX_DURATION_SECONDS,
};
use crate::schema::{self, ParsedCandidate};
use crate::{MovementType, PhaseKind};
use serde_json::{json, Map, Value};

const DEFAULT_SETS: u32 = 1;
const DEFAULT_REPS: u32 = 10;
const DEFAULT_REST_SECONDS: u32 = 30;
const DEFAULT_FORM: &str = "Move with control and keep a neutral spine";

/// Gives every exercise an id, a name and sane numeric fields
pub struct ExerciseProcessor;

impl Processor for ExerciseProcessor {
    fn name(&self) -> &'static str {
        "exercise"
    }

    fn process(
        &self,
        tree: &mut ParsedCandidate,
        _ctx: &NormalizeContext<'_>,
        log: &mut NormalizationLog,
    ) {
        for kind in PhaseKind::ALL {
            let Some(Value::Array(items)) = tree
                .get_mut(kind.key())
                .and_then(Value::as_object_mut)
                .and_then(|phase| phase.get_mut(schema::EXERCISES))
            else {
                continue;
            };

            let raw = std::mem::take(items);
            let mut exercises = Vec::with_capacity(raw.len());
            for (idx, item) in raw.into_iter().enumerate() {
                match item {
                    Value::Object(map) => exercises.push(map),
                    Value::String(name) if !name.trim().is_empty() => {
                        log.repaired(
                            format!("{} exercise {} given as text", kind.key(), idx + 1),
                            format!("converted '{}' to an exercise", name.trim()),
                        );
                        let mut map = Map::new();
                        map.insert(schema::NAME.into(), json!(name.trim()));
                        exercises.push(map);
                    }
                    other => log.repaired(
                        format!("malformed exercise in {}: {}", kind.key(), other),
                        format!("removed {} exercise {}", kind.key(), idx + 1),
                    ),
                }
            }

            *items = exercises
                .into_iter()
                .enumerate()
                .map(|(idx, mut exercise)| {
                    normalize_exercise(kind, idx + 1, &mut exercise, log);
                    Value::Object(exercise)
                })
                .collect();
        }
    }
}

fn normalize_exercise(
    kind: PhaseKind,
    n: usize,
    exercise: &mut Map<String, Value>,
    log: &mut NormalizationLog,
) {
    let label = format!("{} exercise {}", kind.key(), n);

    let name = match exercise.get(schema::NAME).and_then(schema::as_text) {
        Some(name) => name.to_string(),
        None => {
            let name = format!("Exercise {}", n);
            log.repaired(format!("{} has no name", label), format!("named {} '{}'", label, name));
            name
        }
    };
    exercise.insert(schema::NAME.into(), json!(name));

    if exercise.get(schema::ID).and_then(schema::as_text).is_none() {
        let id = format!("{}-{}", kind.slug(), n);
        log.fix(format!("assigned id {} to {}", id, label));
        exercise.insert(schema::ID.into(), json!(id));
    }

    if exercise.get(schema::DESCRIPTION).and_then(schema::as_text).is_none() {
        log.fix(format!("added description for {}", label));
        exercise.insert(schema::DESCRIPTION.into(), json!(name));
    }

    let raw = schema::take(exercise, schema::DURATION, schema::DURATION_ALIASES);
    let duration = match raw.as_ref().and_then(|v| resolve_seconds(v).map(|r| (v, r))) {
        Some((v, resolved)) => {
            if v.as_f64() != Some(f64::from(resolved.seconds)) {
                log.fix(format!("{} duration converted to {}s", label, resolved.seconds));
            }
            resolved.seconds
        }
        None => {
            log.fix(format!("{} duration defaulted to {}s", label, DEFAULT_EXERCISE_SECONDS));
            DEFAULT_EXERCISE_SECONDS
        }
    };
    exercise.insert(schema::DURATION.into(), json!(duration));

    let sets = count_field(exercise, schema::SETS, &[], DEFAULT_SETS, &label, log);
    exercise.insert(schema::SETS.into(), json!(sets));

    let reps = count_field(exercise, schema::REPS, schema::REPS_ALIASES, DEFAULT_REPS, &label, log);
    exercise.insert(schema::REPS.into(), json!(reps));

    let raw = schema::take(exercise, schema::REST, schema::REST_ALIASES);
    let rest = match raw.as_ref().and_then(rest_seconds) {
        Some(rest) => {
            if raw.as_ref().and_then(Value::as_f64) != Some(f64::from(rest)) {
                log.fix(format!("{} rest converted to {}s", label, rest));
            }
            rest
        }
        None => {
            log.fix(format!("{} rest defaulted to {}s", label, DEFAULT_REST_SECONDS));
            DEFAULT_REST_SECONDS
        }
    };
    exercise.insert(schema::REST.into(), json!(rest));

    if exercise.get(schema::FORM).and_then(schema::as_text).is_none() {
        log.fix(format!("added form cue for {}", label));
        exercise.insert(schema::FORM.into(), json!(DEFAULT_FORM));
    }

    for (field, aliases) in schema::EXERCISE_ARRAY_FIELDS {
        let (value, note) = coerce_string_array(schema::take(exercise, field, aliases));
        if let Some(note) = note {
            log.fix(format!("{} {}: {}", label, field, note));
        }
        exercise.insert((*field).into(), value);
    }

    let raw = schema::take(exercise, schema::MOVEMENT_TYPE, schema::MOVEMENT_TYPE_ALIASES);
    let raw = raw.as_ref().and_then(Value::as_str);
    let movement = match raw.and_then(MovementType::parse) {
        Some(movement) => {
            if raw != Some(movement.as_str()) {
                log.fix(format!("{} movement type set to {}", label, movement.as_str()));
            }
            movement
        }
        None => {
            log.fix(format!("{} movement type defaulted to strength", label));
            MovementType::Strength
        }
    };
    exercise.insert(schema::MOVEMENT_TYPE.into(), json!(movement.as_str()));
}

/// A positive whole count such as sets or reps
fn count_field(
    exercise: &mut Map<String, Value>,
    key: &str,
    aliases: &[&str],
    default: u32,
    label: &str,
    log: &mut NormalizationLog,
) -> u32 {
    let raw = schema::take(exercise, key, aliases);
    match raw.as_ref().and_then(schema::as_number).filter(|n| *n >= 1.0) {
        Some(n) => {
            let count = n.round() as u32;
            if raw.as_ref().and_then(Value::as_f64) != Some(f64::from(count)) {
                log.fix(format!("{} {} converted to {}", label, key, count));
            }
            count
        }
        None => {
            log.fix(format!("{} {} defaulted to {}", label, key, default));
            default
        }
    }
}

/// Rest in seconds; strings naming minutes are scaled
fn rest_seconds(value: &Value) -> Option<u32> {
    let n = schema::as_number(value).filter(|n| *n >= 0.0)?;
    let in_minutes = value.as_str().is_some_and(|s| {
        s.trim()
            .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.')
            .trim_start()
            .to_lowercase()
            .starts_with('m')
    });
    let seconds = if in_minutes { n * 60.0 } else { n };
    Some(seconds.round().min(f64::from(MAX_DURATION_SECONDS)) as u32)
}
