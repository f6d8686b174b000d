//! Catalog of canonical workout durations.
//!
//! Every workout the system produces uses one of these lengths. The table
//! is built once and never mutated, so it can be shared across requests
//! without locking.

use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<DurationCatalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static DurationCatalog {
    &DEFAULT_CATALOG
}

/// Canonical durations keyed by minutes
#[derive(Clone, Debug)]
pub struct DurationCatalog {
    pub configs: BTreeMap<u32, DurationConfig>,
}

fn config(
    minutes: u32,
    name: &str,
    (warmup, main, cooldown): (u32, u32, u32),
    (warmup_pct, main_pct, cooldown_pct): (u32, u32, u32),
    complexity_tier: ComplexityTier,
    variable_requirement_tier: VariableRequirementTier,
) -> DurationConfig {
    DurationConfig {
        duration_minutes: minutes,
        name: name.into(),
        exercise_count: ExerciseCount {
            warmup,
            main,
            cooldown,
            total: warmup + main + cooldown,
        },
        time_allocation: TimeAllocation {
            warmup_pct,
            main_pct,
            cooldown_pct,
        },
        complexity_tier,
        variable_requirement_tier,
    }
}

/// Builds the default catalog of canonical durations
///
/// **Note**: For production use, prefer `get_default_catalog()` which returns a
/// cached reference. This function is retained for testing and custom catalogs.
pub fn build_default_catalog() -> DurationCatalog {
    use ComplexityTier as C;
    use VariableRequirementTier as V;

    let configs = [
        config(5, "Quick Burst", (1, 2, 1), (20, 60, 20), C::Minimal, V::Essential),
        config(10, "Express", (2, 3, 1), (20, 65, 15), C::Basic, V::Essential),
        config(15, "Focused", (2, 4, 2), (15, 70, 15), C::Basic, V::Standard),
        config(20, "Standard", (3, 5, 2), (15, 70, 15), C::Moderate, V::Standard),
        config(30, "Complete", (3, 6, 3), (15, 70, 15), C::Advanced, V::Enhanced),
        config(45, "Extended", (4, 8, 3), (15, 70, 15), C::Comprehensive, V::Complete),
    ];

    DurationCatalog {
        configs: configs
            .into_iter()
            .map(|c| (c.duration_minutes, c))
            .collect(),
    }
}

impl DurationCatalog {
    pub fn get(&self, minutes: u32) -> Option<&DurationConfig> {
        self.configs.get(&minutes)
    }

    pub fn contains(&self, minutes: u32) -> bool {
        self.configs.contains_key(&minutes)
    }

    /// Canonical durations in ascending order
    pub fn durations(&self) -> Vec<u32> {
        self.configs.keys().copied().collect()
    }

    /// Closest canonical duration to `minutes`
    ///
    /// On a tie the smaller duration wins. Keys are visited in ascending
    /// order and only a strictly smaller distance replaces the current best.
    pub fn closest(&self, minutes: u32) -> Option<u32> {
        let mut best: Option<(u32, u32)> = None;
        for &key in self.configs.keys() {
            let distance = key.abs_diff(minutes);
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((key, distance)),
            }
        }
        best.map(|(key, _)| key)
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors, or empty Vec if valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.configs.is_empty() {
            errors.push("Catalog has no durations".to_string());
        }

        for (minutes, config) in &self.configs {
            if *minutes == 0 {
                errors.push("Catalog contains a zero-minute duration".to_string());
            }
            if *minutes != config.duration_minutes {
                errors.push(format!(
                    "Catalog key {} doesn't match config duration {}",
                    minutes, config.duration_minutes
                ));
            }
            if config.name.is_empty() {
                errors.push(format!("Duration {} has empty name", minutes));
            }

            let counts = &config.exercise_count;
            if counts.warmup + counts.main + counts.cooldown != counts.total {
                errors.push(format!(
                    "Duration {}: exercise counts {}+{}+{} don't sum to total {}",
                    minutes, counts.warmup, counts.main, counts.cooldown, counts.total
                ));
            }
            if counts.main == 0 {
                errors.push(format!("Duration {} has no main exercises", minutes));
            }

            let alloc = &config.time_allocation;
            let pct_sum = alloc.warmup_pct + alloc.main_pct + alloc.cooldown_pct;
            if pct_sum != 100 {
                errors.push(format!(
                    "Duration {}: time allocation sums to {}%, expected 100%",
                    minutes, pct_sum
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.durations(), vec![5, 10, 15, 20, 30, 45]);
    }

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_validate_reports_bad_allocation() {
        let mut catalog = build_default_catalog();
        if let Some(c) = catalog.configs.get_mut(&20) {
            c.time_allocation.main_pct = 80;
            c.exercise_count.total = 99;
        }
        let errors = catalog.validate();
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors.iter().any(|e| e.contains("110%")));
        assert!(errors.iter().any(|e| e.contains("don't sum")));
    }

    #[test]
    fn test_complexity_increases_with_duration() {
        let catalog = build_default_catalog();
        let tiers: Vec<_> = catalog.configs.values().map(|c| c.complexity_tier).collect();
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_phase_targets_sum_to_total() {
        for config in build_default_catalog().configs.values() {
            let sum: u32 = PhaseKind::ALL
                .iter()
                .map(|p| config.phase_target_seconds(*p))
                .sum();
            assert_eq!(sum, config.total_seconds(), "{}", config.duration_minutes);
        }
    }

    #[test]
    fn test_closest_prefers_smaller_on_tie() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.closest(7), Some(5));
        assert_eq!(catalog.closest(25), Some(20));
        assert_eq!(catalog.closest(8), Some(10));
        assert_eq!(catalog.closest(0), Some(5));
        assert_eq!(catalog.closest(120), Some(45));
    }

    #[test]
    fn test_cached_catalog_matches_built() {
        assert_eq!(
            get_default_catalog().durations(),
            build_default_catalog().durations()
        );
    }
}
