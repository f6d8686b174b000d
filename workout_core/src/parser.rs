//! Response parser for turning raw LLM output into a candidate workout tree.
//!
//! Strategies are tried in order and the first confident result wins:
//! 1. Direct decode of the whole response
//! 2. A ```json fenced block
//! 3. Any untagged ``` fenced block
//! 4. The most workout-shaped balanced `{...}` substring
//! 5. Conversational cleanup, then first `{` to last `}`
//! 6. Heuristic synthesis from the prose (never fails)

use crate::schema::{self, ParsedCandidate};
use crate::synthesis::synthesize_workout;
use crate::PhaseKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Minimum shape score for a scanned substring to be accepted
pub const MIN_CANDIDATE_SCORE: u32 = 30;

static FENCED_JSON: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?is)```[ \t]*json[ \t]*\r?\n?(.*?)(?:```|\z)").ok());

static FENCED_PLAIN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?s)```[ \t]*\r?\n(.*?)(?:```|\z)").ok());

static CHATTY_PREFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:sure|certainly|absolutely|of course|okay|ok|great)[!.,]*\s*|here(?:'s| is| are)[^:\n{]*:\s*)",
    )
    .ok()
});

static CHATTY_SUFFIX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*(?:enjoy your workout|let me know if|hope this helps|good luck|have a great workout|stay hydrated)[^{}]*$",
    )
    .ok()
});

static TRAILING_COMMA: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r",(\s*[}\]])").ok());

/// Raw response handed back by the LLM client
#[derive(Clone, Debug, PartialEq)]
pub enum LlmResponse {
    Text(String),
    Structured(Value),
}

impl From<String> for LlmResponse {
    fn from(s: String) -> Self {
        LlmResponse::Text(s)
    }
}

impl From<&str> for LlmResponse {
    fn from(s: &str) -> Self {
        LlmResponse::Text(s.to_string())
    }
}

impl From<Value> for LlmResponse {
    fn from(v: Value) -> Self {
        LlmResponse::Structured(v)
    }
}

/// Which strategy produced the accepted candidate
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    DirectDecode,
    FencedJson,
    FencedBlock,
    BestCandidate,
    CleanupRetry,
    TextSynthesis,
}

impl ParseStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            ParseStrategy::DirectDecode => "direct_decode",
            ParseStrategy::FencedJson => "fenced_json",
            ParseStrategy::FencedBlock => "fenced_block",
            ParseStrategy::BestCandidate => "best_candidate",
            ParseStrategy::CleanupRetry => "cleanup_retry",
            ParseStrategy::TextSynthesis => "text_synthesis",
        }
    }
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural facts about the raw response, recorded before parsing
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDiagnostics {
    pub content_length: usize,
    pub truncation_suspected: bool,
    /// Byte offset just past the last `}`
    pub truncation_point: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub success: bool,
    pub data: ParsedCandidate,
    pub strategy_used: ParseStrategy,
    pub issues: Vec<String>,
    pub diagnostics: ResponseDiagnostics,
}

type Strategy = fn(&str) -> Option<Value>;

const STRATEGIES: [(ParseStrategy, Strategy); 5] = [
    (ParseStrategy::DirectDecode, direct_decode),
    (ParseStrategy::FencedJson, fenced_json),
    (ParseStrategy::FencedBlock, fenced_block),
    (ParseStrategy::BestCandidate, best_candidate),
    (ParseStrategy::CleanupRetry, cleanup_retry),
];

/// Parse a raw LLM response into a candidate workout tree
///
/// Never fails. When no strategy yields a confident object the response
/// text is mined for exercises and a minimal workout is synthesized.
pub fn parse_response(raw: &LlmResponse) -> ParseResult {
    let mut issues = Vec::new();

    let text = match raw {
        LlmResponse::Structured(Value::Object(map)) => {
            match accept(Value::Object(map.clone())) {
                Ok(data) => {
                    let diagnostics = ResponseDiagnostics {
                        content_length: Value::Object(map.clone()).to_string().len(),
                        ..Default::default()
                    };
                    return finish(ParseStrategy::DirectDecode, data, issues, diagnostics);
                }
                Err(reason) => {
                    issues.push(format!("direct_decode: structured response {}", reason));
                    Value::Object(map.clone()).to_string()
                }
            }
        }
        LlmResponse::Structured(Value::String(s)) => s.clone(),
        LlmResponse::Structured(other) => other.to_string(),
        LlmResponse::Text(s) => s.clone(),
    };

    let diagnostics = inspect_structure(&text);
    if diagnostics.truncation_suspected {
        tracing::warn!(
            "Response of {} bytes does not end with '}}', possible truncation",
            diagnostics.content_length
        );
        issues.push(format!(
            "response may be truncated: does not end with '}}' (length {}, last brace at {})",
            diagnostics.content_length,
            diagnostics
                .truncation_point
                .map(|p| p.to_string())
                .unwrap_or_else(|| "none".into())
        ));
    }

    for (strategy, attempt) in STRATEGIES {
        match attempt(&text).map(accept) {
            Some(Ok(data)) => return finish(strategy, data, issues, diagnostics),
            Some(Err(reason)) => {
                tracing::debug!("{} produced a low-confidence result: {}", strategy, reason);
                issues.push(format!("{}: low confidence, {}", strategy, reason));
            }
            None => {
                tracing::debug!("{} failed", strategy);
                issues.push(format!("{}: no decodable JSON found", strategy));
            }
        }
    }

    tracing::warn!("No JSON could be extracted, synthesizing a workout from text");
    let data = synthesize_workout(&text);
    finish(ParseStrategy::TextSynthesis, data, issues, diagnostics)
}

fn finish(
    strategy: ParseStrategy,
    data: ParsedCandidate,
    mut issues: Vec<String>,
    diagnostics: ResponseDiagnostics,
) -> ParseResult {
    issues.extend(inspect_candidate(&data));
    tracing::info!(
        "Parsed response via {} ({} issues)",
        strategy,
        issues.len()
    );
    ParseResult {
        success: true,
        data,
        strategy_used: strategy,
        issues,
        diagnostics,
    }
}

/// Accept a decoded value if it is an object with at least one workout field
fn accept(value: Value) -> Result<ParsedCandidate, &'static str> {
    match value {
        Value::Object(map) if schema::workout_shape_score(&map) > 0 => Ok(map),
        Value::Object(_) => Err("decoded object has no workout fields"),
        _ => Err("decoded value is not an object"),
    }
}

fn inspect_structure(text: &str) -> ResponseDiagnostics {
    let trimmed = text.trim_end();
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed).trim_end();
    ResponseDiagnostics {
        content_length: text.len(),
        truncation_suspected: !trimmed.ends_with('}'),
        truncation_point: text.rfind('}').map(|i| i + 1),
    }
}

/// Anomalies in an accepted candidate that the normalizer will have to repair
fn inspect_candidate(data: &ParsedCandidate) -> Vec<String> {
    let mut issues = Vec::new();

    for field in [schema::ID, schema::TITLE] {
        if data.get(field).and_then(schema::as_text).is_none() {
            issues.push(format!("missing field: {}", field));
        }
    }

    for kind in PhaseKind::ALL {
        match schema::find(data, kind.key(), schema::phase_aliases(kind)) {
            None | Some(Value::Null) => issues.push(format!("missing field: {}", kind.key())),
            Some(Value::Array(_)) => {
                issues.push(format!("malformed phase: {} is a bare array", kind.key()))
            }
            Some(Value::Object(phase)) => match phase.get(schema::EXERCISES) {
                None => issues.push(format!("missing field: {}.exercises", kind.key())),
                Some(Value::Array(_)) => {}
                Some(_) => issues.push(format!(
                    "malformed array: {}.exercises is not an array",
                    kind.key()
                )),
            },
            Some(_) => issues.push(format!("malformed phase: {} is not an object", kind.key())),
        }
    }

    issues
}

// ============================================================================
// Strategies
// ============================================================================

fn direct_decode(text: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(text.trim()).ok()? {
        // Double-encoded: a JSON string that itself holds JSON
        Value::String(inner) => serde_json::from_str(inner.trim()).ok(),
        value => Some(value),
    }
}

fn fenced_json(text: &str) -> Option<Value> {
    decode_first_capture(FENCED_JSON.as_ref()?, text)
}

fn fenced_block(text: &str) -> Option<Value> {
    decode_first_capture(FENCED_PLAIN.as_ref()?, text)
}

fn decode_first_capture(re: &Regex, text: &str) -> Option<Value> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .find_map(|m| serde_json::from_str::<Value>(m.as_str().trim()).ok())
}

fn best_candidate(text: &str) -> Option<Value> {
    let mut best: Option<(u32, Value)> = None;

    for (start, _) in text.match_indices('{') {
        let Some(slice) = balanced_object(&text[start..]) else {
            continue;
        };
        let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(slice) else {
            continue;
        };
        let score = value.as_object().map(schema::workout_shape_score).unwrap_or(0);
        tracing::debug!("Candidate at byte {} scored {}", start, score);
        if best.as_ref().map_or(true, |(s, _)| score > *s) {
            best = Some((score, value));
        }
    }

    best.filter(|(score, _)| *score >= MIN_CANDIDATE_SCORE)
        .map(|(_, value)| value)
}

fn cleanup_retry(text: &str) -> Option<Value> {
    let mut cleaned = text.trim().to_string();
    if let Some(re) = CHATTY_PREFIX.as_ref() {
        while let Some(m) = re.find(&cleaned) {
            if m.as_str().is_empty() {
                break;
            }
            cleaned = cleaned[m.end()..].to_string();
        }
    }
    if let Some(re) = CHATTY_SUFFIX.as_ref() {
        cleaned = re.replace(&cleaned, "").into_owned();
    }

    cleaned = cleaned
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    if let Some(re) = TRAILING_COMMA.as_ref() {
        cleaned = re.replace_all(&cleaned, "$1").into_owned();
    }

    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&cleaned[start..=end]).ok()
}

/// The balanced `{...}` prefix of `s`, skipping braces inside strings
///
/// `s` must start with `{`. Returns None when the object never closes.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FENCED: &str = "Sure! ```json\n{\"id\":\"w1\",\"title\":\"T\",\"warmup\":{\"exercises\":[{\"name\":\"A\",\"duration\":1}]},\"mainWorkout\":{\"exercises\":[]},\"cooldown\":{\"exercises\":[]}}\n```";

    #[test]
    fn test_direct_decode() {
        let raw = r#"{"id": "w1", "title": "Leg Day", "warmup": {"exercises": []}}"#;
        let result = parse_response(&raw.into());
        assert!(result.success);
        assert_eq!(result.strategy_used, ParseStrategy::DirectDecode);
        assert_eq!(result.data["title"], "Leg Day");
        assert!(!result.diagnostics.truncation_suspected);
    }

    #[test]
    fn test_structured_object_is_accepted() {
        let raw = LlmResponse::Structured(json!({"title": "X", "mainWorkout": {"exercises": []}}));
        let result = parse_response(&raw);
        assert_eq!(result.strategy_used, ParseStrategy::DirectDecode);
        assert!(result.issues.iter().any(|i| i == "missing field: id"));
    }

    #[test]
    fn test_double_encoded_json() {
        let inner = r#"{"id": "w2", "title": "T", "cooldown": {"exercises": []}}"#;
        let raw = serde_json::to_string(inner).unwrap();
        let result = parse_response(&raw.into());
        assert_eq!(result.strategy_used, ParseStrategy::DirectDecode);
        assert_eq!(result.data["id"], "w2");
    }

    #[test]
    fn test_fenced_json_block() {
        let result = parse_response(&FENCED.into());
        assert!(result.success);
        assert_eq!(result.strategy_used, ParseStrategy::FencedJson);
        assert_eq!(result.data["id"], "w1");
        assert_eq!(result.data["warmup"]["exercises"][0]["duration"], 1);
        assert!(result
            .issues
            .iter()
            .any(|i| i.starts_with("direct_decode")));
    }

    #[test]
    fn test_untagged_fenced_block() {
        let raw = "Plan below\n```\n{\"title\": \"Core\", \"mainWorkout\": {\"exercises\": []}}\n```\nThanks";
        let result = parse_response(&raw.into());
        assert_eq!(result.strategy_used, ParseStrategy::FencedBlock);
        assert_eq!(result.data["title"], "Core");
    }

    #[test]
    fn test_best_candidate_prefers_workout_shape() {
        let raw = r#"Notes: {"tip": "hydrate"} and the plan {"id": "a", "title": "B", "warmup": {}, "mainWorkout": {"exercises": [{"name": "x"}]}, "cooldown": {}} done. {"id": "zzz"}"#;
        let result = parse_response(&raw.into());
        assert_eq!(result.strategy_used, ParseStrategy::BestCandidate);
        assert_eq!(result.data["id"], "a");
    }

    #[test]
    fn test_best_candidate_found_after_many_braces() {
        let mut raw: String = (0..70).map(|n| format!("{{f{}}} ", n)).collect();
        raw.push_str(r#"Plan: {"id": "w", "title": "T", "warmup": {"exercises": []}, "mainWorkout": {"exercises": [{"name": "Squat"}]}, "cooldown": {"exercises": []}}"#);
        let result = parse_response(&raw.as_str().into());
        assert_eq!(result.strategy_used, ParseStrategy::BestCandidate);
        assert_eq!(result.data["id"], "w");
    }

    #[test]
    fn test_best_candidate_requires_minimum_score() {
        // Only a weak candidate (id + title = 20) is present, and cleanup
        // finds the same object, so cleanup_retry is the strategy that wins
        let raw = r#"Result: {"id": "a", "title": "B"} -- {broken"#;
        let result = parse_response(&raw.into());
        assert!(result
            .issues
            .iter()
            .any(|i| i.starts_with("best_candidate")));
        assert_ne!(result.strategy_used, ParseStrategy::BestCandidate);
    }

    #[test]
    fn test_cleanup_retry_strips_chatter_and_trailing_commas() {
        let raw = "Here's your workout plan: {\"id\": \"c1\", \"title\": \"Push\", \"warmup\": {\"exercises\": [{\"name\": \"Arm circles\",},],}, \"mainWorkout\": {\"exercises\": []},} Enjoy your workout!";
        let result = parse_response(&raw.into());
        assert_eq!(result.strategy_used, ParseStrategy::CleanupRetry);
        assert_eq!(result.data["id"], "c1");
        assert_eq!(result.data["warmup"]["exercises"][0]["name"], "Arm circles");
    }

    #[test]
    fn test_prose_falls_back_to_synthesis() {
        let raw = "Start with 10 push ups.\nThen do 20 squats.\nFinish by stretching.";
        let result = parse_response(&raw.into());
        assert!(result.success);
        assert_eq!(result.strategy_used, ParseStrategy::TextSynthesis);
        for kind in PhaseKind::ALL {
            let exercises = result.data[kind.key()]["exercises"].as_array().unwrap();
            assert!(!exercises.is_empty(), "{} has no exercises", kind.key());
        }
        assert_eq!(
            result.data["mainWorkout"]["exercises"].as_array().unwrap().len(),
            2
        );
        assert!(result.diagnostics.truncation_suspected);
    }

    #[test]
    fn test_truncated_response_is_flagged() {
        let raw = r#"{"id": "t", "title": "Cut", "warmup": {"exercises": [{"name": "Jog", "dur"#;
        let result = parse_response(&raw.into());
        assert!(result.success);
        assert!(result.diagnostics.truncation_suspected);
        assert_eq!(result.diagnostics.content_length, raw.len());
        assert_eq!(result.diagnostics.truncation_point, None);
        assert!(result.issues[0].contains("truncated"));
        assert_eq!(result.strategy_used, ParseStrategy::TextSynthesis);
    }

    #[test]
    fn test_fenced_response_not_flagged_as_truncated() {
        let result = parse_response(&FENCED.into());
        assert!(!result.diagnostics.truncation_suspected);
    }

    #[test]
    fn test_low_confidence_object_is_skipped() {
        let raw = r#"{"message": "I cannot help with that"}"#;
        let result = parse_response(&raw.into());
        assert!(result
            .issues
            .iter()
            .any(|i| i.contains("low confidence")));
        assert_eq!(result.strategy_used, ParseStrategy::TextSynthesis);
    }

    #[test]
    fn test_malformed_exercises_reported() {
        let raw = r#"{"id": "m", "title": "T", "warmup": {"exercises": "jog"}, "mainWorkout": [], "cooldown": {"exercises": []}}"#;
        let result = parse_response(&raw.into());
        assert!(result
            .issues
            .contains(&"malformed array: warmup.exercises is not an array".to_string()));
        assert!(result
            .issues
            .contains(&"malformed phase: mainWorkout is a bare array".to_string()));
    }

    #[test]
    fn test_balanced_object_ignores_braces_in_strings() {
        assert_eq!(
            balanced_object(r#"{"a": "x}y"} tail"#),
            Some(r#"{"a": "x}y"}"#)
        );
        assert_eq!(balanced_object(r#"{"a": {"b": 1}"#), None);
    }

    #[test]
    fn test_parse_never_panics_on_odd_input() {
        for raw in ["", "}", "{", "```", "```json", "null", "[1,2]", "\"str\"", "{{{{"] {
            let result = parse_response(&raw.into());
            assert!(result.success, "failed on {:?}", raw);
        }
    }
}
