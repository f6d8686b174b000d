//! Duration strategy for selecting a canonical workout length.
//!
//! Selection order:
//! - Exact catalog match, else the closest canonical duration
//! - Low energy, high soreness and beginner adjustments (later rules win)
//! - Recommendations and up to three alternatives for the caller

use crate::catalog::{get_default_catalog, DurationCatalog};
use crate::{DurationConfig, DurationStrategyResult, FitnessLevel, WorkoutRequestContext};

const LOW_ENERGY_MAX: u8 = 3;
const HIGH_ENERGY_MIN: u8 = 8;
const LOW_ENERGY_FLOOR_MINUTES: u32 = 10;
const HIGH_SORENESS_AREAS: usize = 3;
const HIGH_SORENESS_FLOOR_MINUTES: u32 = 15;
const BEGINNER_CAP_MINUTES: u32 = 30;
const SHORT_SESSION_MAX_MINUTES: u32 = 10;
const LONG_SESSION_MIN_MINUTES: u32 = 30;
const MAX_ALTERNATIVES: usize = 3;

/// Select a duration strategy against the default catalog
pub fn select_duration_strategy(ctx: &WorkoutRequestContext) -> DurationStrategyResult {
    select_duration_strategy_with(get_default_catalog(), ctx)
}

/// Select a duration strategy against a specific catalog
///
/// Never fails: an unsupported request degrades to the nearest canonical
/// duration. An empty catalog falls back to the default one.
pub fn select_duration_strategy_with(
    catalog: &DurationCatalog,
    ctx: &WorkoutRequestContext,
) -> DurationStrategyResult {
    let Some(smallest) = catalog.configs.values().next() else {
        tracing::warn!("Empty duration catalog supplied, using the default catalog");
        return select_duration_strategy_with(get_default_catalog(), ctx);
    };

    let requested = ctx.requested_duration_minutes;
    let mut reasons: Vec<&str> = Vec::new();

    // Step 1/2: exact match or nearest
    let mut selected = if catalog.contains(requested) {
        requested
    } else {
        reasons.push("duration not directly supported");
        catalog.closest(requested).unwrap_or(requested)
    };
    tracing::debug!("Requested {} min, nearest canonical {} min", requested, selected);

    // Rule a: low energy
    if ctx.energy_level <= LOW_ENERGY_MAX {
        if let Some(d) = largest_in_range(catalog, LOW_ENERGY_FLOOR_MINUTES, selected) {
            tracing::debug!("Low energy ({}): {} -> {} min", ctx.energy_level, selected, d);
            selected = d;
            reasons.push("low energy level");
        }
    }

    // Rule b: high soreness
    if ctx.soreness_areas.len() >= HIGH_SORENESS_AREAS {
        if let Some(d) = largest_in_range(catalog, HIGH_SORENESS_FLOOR_MINUTES, selected) {
            tracing::debug!(
                "High soreness ({} areas): {} -> {} min",
                ctx.soreness_areas.len(),
                selected,
                d
            );
            selected = d;
            reasons.push("high soreness");
        }
    }

    // Rule c: beginner cap
    if ctx.fitness_level == FitnessLevel::NewToExercise && selected > BEGINNER_CAP_MINUTES {
        tracing::debug!("Beginner cap: {} -> {} min", selected, BEGINNER_CAP_MINUTES);
        selected = clamp_to_catalog(catalog, BEGINNER_CAP_MINUTES);
        reasons.push("beginner cap");
    }

    // Every branch above lands on a catalog key
    let config = catalog.get(selected).unwrap_or(smallest).clone();
    let selected = config.duration_minutes;

    let is_exact_match = selected == requested;
    let adjustment_reason = if reasons.is_empty() {
        None
    } else {
        Some(format!("Adjusted for: {}", reasons.join(", ")))
    };

    let recommendations = build_recommendations(ctx, selected);
    let alternative_options = alternatives(catalog, requested, selected);

    tracing::info!(
        "Selected {} min ({}) for request of {} min{}",
        selected,
        config.name,
        requested,
        adjustment_reason
            .as_deref()
            .map(|r| format!(" - {}", r))
            .unwrap_or_default()
    );

    DurationStrategyResult {
        config,
        adjusted_duration_minutes: selected,
        is_exact_match,
        adjustment_reason,
        recommendations,
        alternative_options,
    }
}

/// Largest catalog key within `[floor, ceiling]`
fn largest_in_range(catalog: &DurationCatalog, floor: u32, ceiling: u32) -> Option<u32> {
    if floor > ceiling {
        return None;
    }
    catalog.configs.range(floor..=ceiling).next_back().map(|(k, _)| *k)
}

/// Largest catalog key not above `cap`, or the smallest key if all are above it
fn clamp_to_catalog(catalog: &DurationCatalog, cap: u32) -> u32 {
    catalog
        .configs
        .range(..=cap)
        .next_back()
        .map(|(k, _)| *k)
        .or_else(|| catalog.configs.keys().next().copied())
        .unwrap_or(cap)
}

fn build_recommendations(ctx: &WorkoutRequestContext, selected: u32) -> Vec<String> {
    let mut recs = Vec::new();

    if ctx.energy_level <= LOW_ENERGY_MAX {
        recs.push(
            "Energy is low today: keep the pace easy and stop if anything feels off".to_string(),
        );
    } else if ctx.energy_level >= HIGH_ENERGY_MIN {
        recs.push("Energy is high: push the intensity during the main block".to_string());
    }

    if !ctx.soreness_areas.is_empty() {
        let areas: Vec<&str> = ctx.soreness_areas.iter().map(String::as_str).collect();
        recs.push(format!(
            "Avoid loading sore areas: {}",
            areas.join(", ")
        ));
    }

    if selected <= SHORT_SESSION_MAX_MINUTES {
        recs.push("Short session: keep transitions tight to maximize work time".to_string());
    } else if selected >= LONG_SESSION_MIN_MINUTES {
        recs.push("Longer session: rotate movement patterns for variety".to_string());
    }

    if !ctx.equipment.is_empty() {
        let items: Vec<&str> = ctx.equipment.iter().map(String::as_str).collect();
        recs.push(format!("Make use of available equipment: {}", items.join(", ")));
    }

    match ctx.fitness_level {
        FitnessLevel::NewToExercise => {
            recs.push("Focus on form before speed or load".to_string());
        }
        FitnessLevel::AdvancedAthlete => {
            recs.push("Add tempo or load progressions to keep the work challenging".to_string());
        }
        FitnessLevel::SomeExperience => {}
    }

    recs
}

/// Other catalog configs ranked by distance to the original request
fn alternatives(catalog: &DurationCatalog, requested: u32, selected: u32) -> Vec<DurationConfig> {
    let mut others: Vec<&DurationConfig> = catalog
        .configs
        .values()
        .filter(|c| c.duration_minutes != selected)
        .collect();

    // Stable sort over ascending keys keeps the smaller duration first on ties
    others.sort_by_key(|c| c.duration_minutes.abs_diff(requested));
    others.into_iter().take(MAX_ALTERNATIVES).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;

    fn create_test_context(minutes: u32) -> WorkoutRequestContext {
        WorkoutRequestContext::new(minutes)
    }

    #[test]
    fn test_exact_match_for_every_canonical_duration() {
        for d in build_default_catalog().durations() {
            let result = select_duration_strategy(&create_test_context(d));
            assert!(result.is_exact_match, "{} should match exactly", d);
            assert_eq!(result.adjusted_duration_minutes, d);
            assert!(result.adjustment_reason.is_none());
        }
    }

    #[test]
    fn test_unsupported_duration_picks_nearest() {
        let result = select_duration_strategy(&create_test_context(7));
        assert_eq!(result.adjusted_duration_minutes, 5);
        assert!(!result.is_exact_match);
        assert!(result
            .adjustment_reason
            .as_deref()
            .unwrap()
            .contains("duration not directly supported"));
    }

    #[test]
    fn test_true_tie_prefers_smaller_duration() {
        let result = select_duration_strategy(&create_test_context(25));
        assert_eq!(result.adjusted_duration_minutes, 20);
        let result = select_duration_strategy(&create_test_context(25));
        assert_eq!(result.adjusted_duration_minutes, 20);
    }

    #[test]
    fn test_low_energy_stays_in_bounds() {
        let mut ctx = create_test_context(45);
        ctx.energy_level = 2;

        let result = select_duration_strategy(&ctx);

        assert!(result.adjusted_duration_minutes <= 45);
        assert!(result.adjusted_duration_minutes >= 10);
        assert!(result
            .adjustment_reason
            .as_deref()
            .unwrap()
            .contains("low energy"));
    }

    #[test]
    fn test_low_energy_on_shortest_duration_does_not_apply() {
        let mut ctx = create_test_context(5);
        ctx.energy_level = 1;

        let result = select_duration_strategy(&ctx);

        assert_eq!(result.adjusted_duration_minutes, 5);
        assert!(result.is_exact_match);
        assert!(result.adjustment_reason.is_none());
    }

    #[test]
    fn test_high_soreness_mentioned() {
        let mut ctx = create_test_context(30);
        ctx.soreness_areas = ["legs", "back", "shoulders"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let result = select_duration_strategy(&ctx);

        assert!(result.adjusted_duration_minutes >= 15);
        assert!(result.adjusted_duration_minutes <= 30);
        assert!(result
            .adjustment_reason
            .as_deref()
            .unwrap()
            .contains("high soreness"));
        assert!(result
            .recommendations
            .iter()
            .any(|r| r.contains("back, legs, shoulders")));
    }

    #[test]
    fn test_beginner_cap() {
        let mut ctx = create_test_context(45);
        ctx.fitness_level = FitnessLevel::NewToExercise;

        let result = select_duration_strategy(&ctx);

        assert_eq!(result.adjusted_duration_minutes, 30);
        assert!(!result.is_exact_match);
        assert_eq!(
            result.adjustment_reason.as_deref(),
            Some("Adjusted for: beginner cap")
        );
    }

    #[test]
    fn test_reasons_are_ordered() {
        let mut ctx = create_test_context(60);
        ctx.energy_level = 2;
        ctx.fitness_level = FitnessLevel::NewToExercise;

        let result = select_duration_strategy(&ctx);

        assert_eq!(result.adjusted_duration_minutes, 30);
        assert_eq!(
            result.adjustment_reason.as_deref(),
            Some("Adjusted for: duration not directly supported, low energy level, beginner cap")
        );
    }

    #[test]
    fn test_selection_always_in_catalog() {
        let catalog = build_default_catalog();
        for minutes in 0..=120 {
            for energy in [1, 5, 10] {
                let mut ctx = create_test_context(minutes);
                ctx.energy_level = energy;
                ctx.fitness_level = FitnessLevel::NewToExercise;
                let result = select_duration_strategy(&ctx);
                assert!(catalog.contains(result.adjusted_duration_minutes));
                assert_eq!(result.config.duration_minutes, result.adjusted_duration_minutes);
            }
        }
    }

    #[test]
    fn test_alternatives_ranked_by_distance() {
        let result = select_duration_strategy(&create_test_context(20));
        let alts: Vec<u32> = result
            .alternative_options
            .iter()
            .map(|c| c.duration_minutes)
            .collect();
        assert_eq!(alts, vec![15, 10, 30]);
    }

    #[test]
    fn test_recommendations_follow_context() {
        let mut ctx = create_test_context(5);
        ctx.energy_level = 9;
        ctx.equipment.insert("dumbbells".into());
        ctx.fitness_level = FitnessLevel::AdvancedAthlete;

        let result = select_duration_strategy(&ctx);

        assert_eq!(result.recommendations.len(), 4);
        assert!(result.recommendations[0].contains("Energy is high"));
        assert!(result.recommendations[1].contains("Short session"));
        assert!(result.recommendations[2].contains("dumbbells"));
        assert!(result.recommendations[3].contains("progressions"));
    }

    #[test]
    fn test_neutral_context_has_no_recommendations() {
        let result = select_duration_strategy(&create_test_context(20));
        assert!(result.recommendations.is_empty());
    }
}
