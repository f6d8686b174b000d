//! Core domain types for the workout generation pipeline.
//!
//! This module defines the fundamental types used throughout the system:
//! - Duration configurations and their tiers
//! - Request context supplied by the caller
//! - The schema-complete generated workout (phases, exercises)
//! - Validation results and quality scores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ============================================================================
// Duration Configuration Types
// ============================================================================

/// How involved a workout of a given length is allowed to get
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Minimal,
    Basic,
    Moderate,
    Advanced,
    Comprehensive,
}

/// How much optional detail the LLM is asked to fill in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VariableRequirementTier {
    Essential,
    Standard,
    Enhanced,
    Complete,
}

/// One of the three workout phases
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseKind {
    Warmup,
    Main,
    Cooldown,
}

impl PhaseKind {
    pub const ALL: [PhaseKind; 3] = [PhaseKind::Warmup, PhaseKind::Main, PhaseKind::Cooldown];

    /// Key used for this phase in the serialized workout
    pub const fn key(self) -> &'static str {
        match self {
            PhaseKind::Warmup => "warmup",
            PhaseKind::Main => "mainWorkout",
            PhaseKind::Cooldown => "cooldown",
        }
    }

    /// Short slug used when generating exercise ids
    pub const fn slug(self) -> &'static str {
        match self {
            PhaseKind::Warmup => "warmup",
            PhaseKind::Main => "main",
            PhaseKind::Cooldown => "cooldown",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            PhaseKind::Warmup => "Warm-up",
            PhaseKind::Main => "Main Workout",
            PhaseKind::Cooldown => "Cool-down",
        }
    }
}

/// Exercise counts per phase
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCount {
    pub warmup: u32,
    pub main: u32,
    pub cooldown: u32,
    pub total: u32,
}

/// Share of the total duration given to each phase, in percent
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeAllocation {
    pub warmup_pct: u32,
    pub main_pct: u32,
    pub cooldown_pct: u32,
}

impl TimeAllocation {
    pub const fn pct(&self, phase: PhaseKind) -> u32 {
        match phase {
            PhaseKind::Warmup => self.warmup_pct,
            PhaseKind::Main => self.main_pct,
            PhaseKind::Cooldown => self.cooldown_pct,
        }
    }
}

/// Static configuration for one canonical workout duration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DurationConfig {
    pub duration_minutes: u32,
    pub name: String,
    pub exercise_count: ExerciseCount,
    pub time_allocation: TimeAllocation,
    pub complexity_tier: ComplexityTier,
    pub variable_requirement_tier: VariableRequirementTier,
}

impl DurationConfig {
    pub const fn total_seconds(&self) -> u32 {
        self.duration_minutes * 60
    }

    /// Target length of a phase, derived from the time allocation
    pub const fn phase_target_seconds(&self, phase: PhaseKind) -> u32 {
        self.total_seconds() * self.time_allocation.pct(phase) / 100
    }
}

// ============================================================================
// Request Context Types
// ============================================================================

/// Self-reported training background
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum FitnessLevel {
    #[serde(rename = "new to exercise")]
    NewToExercise,
    #[default]
    #[serde(rename = "some experience")]
    SomeExperience,
    #[serde(rename = "advanced athlete")]
    AdvancedAthlete,
}

impl FitnessLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            FitnessLevel::NewToExercise => "new to exercise",
            FitnessLevel::SomeExperience => "some experience",
            FitnessLevel::AdvancedAthlete => "advanced athlete",
        }
    }

    /// Parse a fitness level, accepting the common beginner/intermediate/advanced labels
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['_', '-'], " ").as_str() {
            "new to exercise" | "beginner" | "novice" | "easy" => Some(FitnessLevel::NewToExercise),
            "some experience" | "intermediate" | "moderate" | "medium" => {
                Some(FitnessLevel::SomeExperience)
            }
            "advanced athlete" | "advanced" | "athlete" | "expert" | "hard" => {
                Some(FitnessLevel::AdvancedAthlete)
            }
            _ => None,
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the caller knows about the request before the LLM is called
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRequestContext {
    pub requested_duration_minutes: u32,
    pub fitness_level: FitnessLevel,
    pub focus: String,
    pub energy_level: u8,
    pub soreness_areas: BTreeSet<String>,
    pub equipment: BTreeSet<String>,
    pub location: Option<String>,
    pub intensity: Option<String>,
}

impl WorkoutRequestContext {
    /// Context with neutral defaults for the given duration
    pub fn new(requested_duration_minutes: u32) -> Self {
        Self {
            requested_duration_minutes,
            fitness_level: FitnessLevel::SomeExperience,
            focus: String::new(),
            energy_level: 5,
            soreness_areas: BTreeSet::new(),
            equipment: BTreeSet::new(),
            location: None,
            intensity: None,
        }
    }
}

/// Selected canonical duration plus the reasoning behind it
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurationStrategyResult {
    pub config: DurationConfig,
    pub adjusted_duration_minutes: u32,
    pub is_exact_match: bool,
    pub adjustment_reason: Option<String>,
    pub recommendations: Vec<String>,
    pub alternative_options: Vec<DurationConfig>,
}

// ============================================================================
// Generated Workout Types
// ============================================================================

/// Broad movement pattern of an exercise
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    #[default]
    Strength,
    Cardio,
    Flexibility,
    Balance,
}

impl MovementType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MovementType::Strength => "strength",
            MovementType::Cardio => "cardio",
            MovementType::Flexibility => "flexibility",
            MovementType::Balance => "balance",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strength" | "resistance" | "power" => Some(MovementType::Strength),
            "cardio" | "conditioning" | "plyometric" | "plyometrics" | "hiit" => {
                Some(MovementType::Cardio)
            }
            "flexibility" | "mobility" | "stretch" | "stretching" => {
                Some(MovementType::Flexibility)
            }
            "balance" | "stability" | "core stability" => Some(MovementType::Balance),
            _ => None,
        }
    }
}

/// A single exercise within a phase
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration_seconds: u32,
    pub sets: u32,
    pub reps: u32,
    pub rest_time_seconds: u32,
    pub equipment: Vec<String>,
    pub form: String,
    pub modifications: Vec<String>,
    pub common_mistakes: Vec<String>,
    pub primary_muscles: Vec<String>,
    pub secondary_muscles: Vec<String>,
    pub movement_type: MovementType,
    pub personalized_notes: Vec<String>,
    pub difficulty_adjustments: Vec<String>,
}

/// Warm-up, main block or cool-down
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPhase {
    pub name: String,
    pub duration_seconds: u32,
    pub exercises: Vec<Exercise>,
    pub instructions: String,
    pub tips: Vec<String>,
}

impl WorkoutPhase {
    /// Exercise time plus the rest taken between consecutive exercises
    ///
    /// Saturates at `u32::MAX` rather than overflowing.
    pub fn exercise_seconds_with_rest(&self) -> u32 {
        let work = self
            .exercises
            .iter()
            .fold(0u32, |acc, e| acc.saturating_add(e.duration_seconds));
        let gaps = self
            .exercises
            .iter()
            .rev()
            .skip(1)
            .fold(0u32, |acc, e| acc.saturating_add(e.rest_time_seconds));
        work.saturating_add(gaps)
    }
}

/// The final, schema-complete workout
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWorkout {
    pub id: String,
    pub title: String,
    pub description: String,
    pub total_duration_seconds: u32,
    pub estimated_calories: u32,
    pub difficulty: FitnessLevel,
    pub equipment: Vec<String>,
    pub warmup: WorkoutPhase,
    pub main_workout: WorkoutPhase,
    pub cooldown: WorkoutPhase,
    pub reasoning: String,
    pub personalized_notes: Vec<String>,
    pub progression_tips: Vec<String>,
    pub safety_reminders: Vec<String>,
    pub generated_at_timestamp: DateTime<Utc>,
    pub ai_model: String,
    pub confidence: f64,
    pub tags: Vec<String>,
}

impl GeneratedWorkout {
    pub fn phase(&self, kind: PhaseKind) -> &WorkoutPhase {
        match kind {
            PhaseKind::Warmup => &self.warmup,
            PhaseKind::Main => &self.main_workout,
            PhaseKind::Cooldown => &self.cooldown,
        }
    }

    pub fn phase_mut(&mut self, kind: PhaseKind) -> &mut WorkoutPhase {
        match kind {
            PhaseKind::Warmup => &mut self.warmup,
            PhaseKind::Main => &mut self.main_workout,
            PhaseKind::Cooldown => &mut self.cooldown,
        }
    }

    pub fn phases(&self) -> impl Iterator<Item = (PhaseKind, &WorkoutPhase)> {
        PhaseKind::ALL.into_iter().map(move |kind| (kind, self.phase(kind)))
    }

    pub fn exercise_count(&self) -> usize {
        self.phases().map(|(_, p)| p.exercises.len()).sum()
    }

    /// Sum of the three phase durations
    pub fn phase_duration_sum(&self) -> u32 {
        self.phases()
            .fold(0u32, |acc, (_, p)| acc.saturating_add(p.duration_seconds))
    }
}

// ============================================================================
// Validation Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub recommendation: String,
}

/// Outcome of structural validation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub score: u32,
}

/// The three 0-100 quality scores
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QualityScores {
    pub structure_score: u32,
    pub completeness_score: u32,
    pub consistency_score: u32,
}
