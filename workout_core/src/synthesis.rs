//! Last-resort workout synthesis from unstructured text.
//!
//! Used when a response contains no usable JSON. Lines that mention a
//! number together with a known movement seed the main block; everything
//! else is a fixed minimal template so the pipeline always has three
//! phases to work with.

use crate::schema::ParsedCandidate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

const WARMUP_SECONDS: u32 = 5 * 60;
const MAIN_SECONDS: u32 = 20 * 60;
const COOLDOWN_SECONDS: u32 = 5 * 60;
const MAX_MAIN_EXERCISES: usize = 3;
const DEFAULT_REPS: u32 = 10;

/// Movement keyword and the exercise name it seeds
const KEYWORDS: &[(&str, &str, &str)] = &[
    ("push", "Push-ups", "strength"),
    ("squat", "Squats", "strength"),
    ("jump", "Jumping Jacks", "cardio"),
    ("plank", "Plank Hold", "balance"),
    ("lunge", "Lunges", "strength"),
    ("crunch", "Crunches", "strength"),
    ("burpee", "Burpees", "cardio"),
];

static NUMBER: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\d+").ok());

/// Build a minimal three-phase candidate from prose
pub fn synthesize_workout(text: &str) -> ParsedCandidate {
    let mut main = Vec::new();
    for line in text.lines() {
        if main.len() >= MAX_MAIN_EXERCISES {
            break;
        }
        let Some((name, movement, reps)) = match_exercise_line(line) else {
            continue;
        };
        if main.iter().any(|(n, _, _)| *n == name) {
            continue;
        }
        main.push((name, movement, reps));
    }

    if main.is_empty() {
        main.push(("Bodyweight Circuit", "strength", DEFAULT_REPS));
    }
    tracing::debug!("Synthesized {} main exercises from text", main.len());

    let per_exercise = MAIN_SECONDS / main.len() as u32;
    let main_exercises: Vec<Value> = main
        .iter()
        .map(|(name, movement, reps)| {
            json!({
                "name": name,
                "description": format!("{} as described in the response", name),
                "duration": per_exercise,
                "sets": 1,
                "reps": reps,
                "movementType": movement,
            })
        })
        .collect();

    let description = match text.trim() {
        "" => "Workout reconstructed from an unstructured response".to_string(),
        t => t.to_string(),
    };

    let candidate = json!({
        "title": "AI Generated Workout",
        "description": description,
        "totalDuration": WARMUP_SECONDS + MAIN_SECONDS + COOLDOWN_SECONDS,
        "warmup": {
            "name": "Warm-up",
            "duration": WARMUP_SECONDS,
            "exercises": [{
                "name": "Dynamic Warm-up",
                "description": "Easy marching, arm circles and hip openers",
                "duration": WARMUP_SECONDS,
                "sets": 1,
                "reps": 1,
                "movementType": "cardio",
            }],
        },
        "mainWorkout": {
            "name": "Main Workout",
            "duration": MAIN_SECONDS,
            "exercises": main_exercises,
        },
        "cooldown": {
            "name": "Cool-down",
            "duration": COOLDOWN_SECONDS,
            "exercises": [{
                "name": "Full Body Stretch",
                "description": "Slow static stretches for the muscles worked",
                "duration": COOLDOWN_SECONDS,
                "sets": 1,
                "reps": 1,
                "movementType": "flexibility",
            }],
        },
        "reasoning": "Reconstructed from a response that contained no structured workout",
        "confidence": 0.3,
    });

    match candidate {
        Value::Object(map) => map,
        _ => ParsedCandidate::new(),
    }
}

/// Exercise name, movement type and reps for a line with a number and a movement
fn match_exercise_line(line: &str) -> Option<(&'static str, &'static str, u32)> {
    let number = NUMBER.as_ref()?.find(line)?;
    let lower = line.to_lowercase();

    let (_, name, movement) = KEYWORDS
        .iter()
        .filter_map(|(kw, name, movement)| lower.find(kw).map(|pos| (pos, *name, *movement)))
        .min_by_key(|(pos, _, _)| *pos)?;

    let reps = number
        .as_str()
        .parse::<u32>()
        .ok()
        .filter(|r| *r > 0)
        .unwrap_or(DEFAULT_REPS);
    Some((name, movement, reps))
}
