//! Top-level workout metadata.

use super::{coerce_string_array, difficulty_for_tier, NormalizationLog, NormalizeContext, Processor};
use crate::schema::{self, ParsedCandidate};
use crate::{FitnessLevel, PhaseKind};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Titles models emit when they have nothing better to say
const PLACEHOLDER_TITLES: &[&str] = &[
    "workout",
    "ai workout",
    "generated workout",
    "ai generated workout",
    "untitled",
    "untitled workout",
    "custom workout",
    "your workout",
    "workout plan",
    "title",
    "string",
];

const CALORIES_PER_MINUTE: u32 = 8;

/// Ensures id, title, description, timestamps, model label, confidence,
/// difficulty, calories and the top-level array fields
pub struct MetadataProcessor;

impl Processor for MetadataProcessor {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn process(
        &self,
        tree: &mut ParsedCandidate,
        ctx: &NormalizeContext<'_>,
        log: &mut NormalizationLog,
    ) {
        let minutes = ctx.minutes();

        match tree.get(schema::ID).and_then(schema::as_text).map(String::from) {
            Some(id) => {
                tree.insert(schema::ID.into(), json!(id));
            }
            None => {
                let id = format!("workout-{}", Uuid::new_v4());
                log.repaired("missing id", format!("generated id {}", id));
                tree.insert(schema::ID.into(), json!(id));
            }
        }

        let title = tree.get(schema::TITLE).and_then(schema::as_text).map(String::from);
        match title {
            Some(t) if !is_placeholder_title(&t) => {
                tree.insert(schema::TITLE.into(), json!(t));
            }
            other => {
                let title = format!("{}-Minute AI Workout", minutes);
                match other {
                    Some(t) => log.repaired(
                        format!("placeholder title '{}'", t),
                        format!("replaced title with '{}'", title),
                    ),
                    None => log.repaired("missing title", format!("set title to '{}'", title)),
                }
                tree.insert(schema::TITLE.into(), json!(title));
            }
        }

        if tree.get(schema::DESCRIPTION).and_then(schema::as_text).is_none() {
            let description = format!(
                "A {}-minute {} session with a warm-up, main block and cool-down",
                minutes,
                ctx.duration.config.name.to_lowercase()
            );
            log.repaired("missing description", "added default description");
            tree.insert(schema::DESCRIPTION.into(), json!(description));
        }

        let generated_at = schema::take(tree, schema::GENERATED_AT, schema::GENERATED_AT_ALIASES)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s.trim()).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let generated_at = generated_at.unwrap_or_else(|| {
            log.fix("set generatedAtTimestamp to now");
            Utc::now()
        });
        tree.insert(
            schema::GENERATED_AT.into(),
            json!(generated_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );

        let model = schema::take(tree, schema::AI_MODEL, schema::AI_MODEL_ALIASES)
            .as_ref()
            .and_then(schema::as_text)
            .map(String::from);
        let model = model.unwrap_or_else(|| {
            log.fix(format!("set aiModel to '{}'", ctx.settings.ai_model));
            ctx.settings.ai_model.clone()
        });
        tree.insert(schema::AI_MODEL.into(), json!(model));

        let confidence = normalize_confidence(tree.get(schema::CONFIDENCE), ctx, log);
        tree.insert(schema::CONFIDENCE.into(), json!(confidence));

        let difficulty = tree
            .get(schema::DIFFICULTY)
            .and_then(Value::as_str)
            .and_then(|s| FitnessLevel::parse(s).map(|level| (s == level.as_str(), level)));
        let difficulty = match difficulty {
            Some((true, level)) => level,
            Some((false, level)) => {
                log.fix(format!("canonicalized difficulty to '{}'", level));
                level
            }
            None => {
                let level = difficulty_for_tier(ctx.duration.config.complexity_tier);
                log.repaired(
                    "missing or unrecognized difficulty",
                    format!("set difficulty to '{}'", level),
                );
                level
            }
        };
        tree.insert(schema::DIFFICULTY.into(), json!(difficulty.as_str()));

        let calories = schema::take(tree, schema::ESTIMATED_CALORIES, schema::ESTIMATED_CALORIES_ALIASES)
            .as_ref()
            .and_then(schema::as_number)
            .filter(|c| *c >= 1.0);
        let calories = match calories {
            Some(c) if c.fract() == 0.0 => c as u32,
            Some(c) => {
                log.fix("rounded estimatedCalories");
                c.round() as u32
            }
            None => {
                let estimate = minutes * CALORIES_PER_MINUTE;
                log.fix(format!("estimated calories as {}", estimate));
                estimate
            }
        };
        tree.insert(schema::ESTIMATED_CALORIES.into(), json!(calories));

        match tree.get(schema::REASONING) {
            Some(Value::String(_)) => {}
            None | Some(Value::Null) => {
                tree.insert(schema::REASONING.into(), json!(""));
                log.fix("defaulted reasoning to empty");
            }
            Some(other) => {
                let text = other.to_string();
                log.fix("converted reasoning to text");
                tree.insert(schema::REASONING.into(), json!(text));
            }
        }

        if tree.get(schema::EQUIPMENT).is_none() {
            let derived = exercise_equipment(tree);
            if !derived.is_empty() {
                log.fix(format!("derived equipment from exercises: {}", derived.join(", ")));
                tree.insert(schema::EQUIPMENT.into(), json!(derived));
            }
        }

        for (field, aliases) in schema::WORKOUT_ARRAY_FIELDS {
            let (value, note) = coerce_string_array(schema::take(tree, field, aliases));
            if let Some(note) = note {
                log.fix(format!("{}: {}", field, note));
            }
            tree.insert((*field).into(), value);
        }
    }
}

pub(crate) fn is_placeholder_title(title: &str) -> bool {
    let lower = title.trim().to_lowercase();
    PLACEHOLDER_TITLES.contains(&lower.as_str())
}

fn normalize_confidence(
    value: Option<&Value>,
    ctx: &NormalizeContext<'_>,
    log: &mut NormalizationLog,
) -> f64 {
    let default = ctx.settings.default_confidence;
    match value.and_then(schema::as_number) {
        Some(c) if (0.0..=1.0).contains(&c) && value.is_some_and(Value::is_number) => c,
        Some(c) if (0.0..=1.0).contains(&c) => {
            log.fix("converted confidence to a number");
            c
        }
        Some(c) if c > 1.0 && c <= 100.0 => {
            log.fix(format!("scaled confidence {} to {}", c, c / 100.0));
            c / 100.0
        }
        Some(c) => {
            log.repaired(
                format!("confidence {} out of range", c),
                format!("set confidence to {}", default),
            );
            default
        }
        None => {
            log.fix(format!("defaulted confidence to {}", default));
            default
        }
    }
}

/// Sorted union of equipment named on any exercise
fn exercise_equipment(tree: &ParsedCandidate) -> Vec<String> {
    let mut found = BTreeSet::new();
    for kind in PhaseKind::ALL {
        let Some(phase) = schema::find(tree, kind.key(), schema::phase_aliases(kind)) else {
            continue;
        };
        let exercises = match phase {
            Value::Object(p) => p.get(schema::EXERCISES).and_then(Value::as_array),
            Value::Array(items) => Some(items),
            _ => None,
        };
        for exercise in exercises.into_iter().flatten() {
            match exercise.get(schema::EQUIPMENT) {
                Some(Value::String(s)) => {
                    found.insert(s.trim().to_string());
                }
                Some(Value::Array(items)) => {
                    found.extend(items.iter().filter_map(schema::as_text).map(String::from));
                }
                _ => {}
            }
        }
    }
    found.retain(|s| !s.is_empty());
    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationConfig;
    use crate::{select_duration_strategy, WorkoutRequestContext};

    fn run(tree: Value, minutes: u32) -> (ParsedCandidate, NormalizationLog) {
        let duration = select_duration_strategy(&WorkoutRequestContext::new(minutes));
        let settings = GenerationConfig::default();
        let ctx = NormalizeContext {
            duration: &duration,
            settings: &settings,
        };
        let mut tree = tree.as_object().cloned().unwrap();
        let mut log = NormalizationLog::default();
        MetadataProcessor.process(&mut tree, &ctx, &mut log);
        (tree, log)
    }

    #[test]
    fn test_placeholder_title_replaced() {
        let (tree, log) = run(json!({"title": "  Untitled Workout "}), 20);
        assert_eq!(tree["title"], "20-Minute AI Workout");
        assert!(log.issues_found.iter().any(|i| i.contains("placeholder")));
    }

    #[test]
    fn test_real_title_kept() {
        let (tree, _) = run(json!({"title": "Lower Body Blast"}), 20);
        assert_eq!(tree["title"], "Lower Body Blast");
    }

    #[test]
    fn test_confidence_handling() {
        assert_eq!(run(json!({"confidence": 0.6}), 10).0["confidence"], 0.6);
        assert_eq!(run(json!({"confidence": 90}), 10).0["confidence"], 0.9);
        assert_eq!(run(json!({"confidence": "0.5"}), 10).0["confidence"], 0.5);
        assert_eq!(run(json!({"confidence": -3}), 10).0["confidence"], 0.8);
        assert_eq!(run(json!({}), 10).0["confidence"], 0.8);
    }

    #[test]
    fn test_timestamp_kept_when_valid() {
        let (tree, log) = run(json!({"generatedAt": "2024-01-15T10:30:00Z"}), 10);
        assert_eq!(tree["generatedAtTimestamp"], "2024-01-15T10:30:00Z");
        assert!(tree.get("generatedAt").is_none());
        assert!(!log.fixes_applied.iter().any(|f| f.contains("generatedAtTimestamp")));
    }

    #[test]
    fn test_arrays_default_to_empty() {
        let (tree, _) = run(json!({"safety_reminders": "Warm up first", "tags": null}), 10);
        assert_eq!(tree["safetyReminders"], json!(["Warm up first"]));
        assert_eq!(tree["tags"], json!([]));
        assert_eq!(tree["personalizedNotes"], json!([]));
        assert_eq!(tree["progressionTips"], json!([]));
    }

    #[test]
    fn test_equipment_derived_from_exercises() {
        let (tree, _) = run(
            json!({
                "warmup": {"exercises": [{"equipment": "mat"}]},
                "main": [{"equipment": ["dumbbells", "mat"]}]
            }),
            20,
        );
        assert_eq!(tree["equipment"], json!(["dumbbells", "mat"]));
    }

    #[test]
    fn test_null_reasoning_becomes_empty() {
        let (tree, log) = run(json!({"reasoning": null}), 10);
        assert_eq!(tree["reasoning"], "");
        assert!(log.fixes_applied.iter().any(|f| f.contains("reasoning")));
    }

    #[test]
    fn test_null_metadata_fields_use_defaults() {
        let (tree, _) = run(
            json!({
                "id": null, "title": null, "description": null, "confidence": null,
                "difficulty": null, "estimatedCalories": null, "aiModel": null,
                "generatedAtTimestamp": null, "tags": null
            }),
            20,
        );
        assert!(tree["id"].as_str().unwrap().starts_with("workout-"));
        assert_eq!(tree["title"], "20-Minute AI Workout");
        assert_eq!(tree["confidence"], 0.8);
        assert_eq!(tree["estimatedCalories"], 160);
        assert_eq!(tree["aiModel"], "unspecified");
        assert_eq!(tree["tags"], json!([]));
    }

    #[test]
    fn test_difficulty_aliases() {
        let (tree, _) = run(json!({"difficulty": "Intermediate"}), 10);
        assert_eq!(tree["difficulty"], "some experience");
        let (tree, _) = run(json!({}), 5);
        assert_eq!(tree["difficulty"], "new to exercise");
    }
}
