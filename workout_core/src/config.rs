//! Configuration file support for wkgen.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/wkgen/config.toml`.

use crate::{Error, FitnessLevel, Result, WorkoutRequestContext};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub profile: ProfileConfig,
}

/// Values the normalizer stamps onto workouts
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    #[serde(default = "default_ai_model")]
    pub ai_model: String,

    #[serde(default = "default_confidence")]
    pub default_confidence: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            ai_model: default_ai_model(),
            default_confidence: default_confidence(),
        }
    }
}

/// Defaults for building a request context from the command line
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    #[serde(default)]
    pub fitness_level: FitnessLevel,

    #[serde(default = "default_energy_level")]
    pub energy_level: u8,

    #[serde(default)]
    pub equipment: Vec<String>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            fitness_level: FitnessLevel::default(),
            energy_level: default_energy_level(),
            equipment: Vec::new(),
        }
    }
}

impl ProfileConfig {
    /// Request context for `minutes` seeded from this profile
    pub fn request_context(&self, minutes: u32) -> WorkoutRequestContext {
        let mut ctx = WorkoutRequestContext::new(minutes);
        ctx.fitness_level = self.fitness_level;
        ctx.energy_level = self.energy_level;
        ctx.equipment = self.equipment.iter().cloned().collect();
        ctx
    }
}

// Default value functions
fn default_ai_model() -> String {
    "unspecified".into()
}

fn default_confidence() -> f64 {
    0.8
}

fn default_energy_level() -> u8 {
    5
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        Ok(base.join("wkgen").join("config.toml"))
    }

    /// Save the current configuration to the default path
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to(&config_path)
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Reject values the pipeline cannot use
    pub fn validate(&self) -> Result<()> {
        let confidence = self.generation.default_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::Config(format!(
                "default_confidence must be between 0 and 1, got {}",
                confidence
            )));
        }

        let energy = self.profile.energy_level;
        if !(1..=10).contains(&energy) {
            return Err(Error::Config(format!(
                "energy_level must be between 1 and 10, got {}",
                energy
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation.ai_model, "unspecified");
        assert_eq!(config.generation.default_confidence, 0.8);
        assert_eq!(config.profile.fitness_level, FitnessLevel::SomeExperience);
        assert_eq!(config.profile.energy_level, 5);
        assert!(config.profile.equipment.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[profile]
fitness_level = "advanced athlete"
equipment = ["dumbbells"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.profile.fitness_level, FitnessLevel::AdvancedAthlete);
        assert_eq!(config.profile.energy_level, 5); // default
        assert_eq!(config.generation.default_confidence, 0.8); // default
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.generation.ai_model = "gpt-4o".into();
        config.profile.energy_level = 3;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.generation.default_confidence = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.profile.energy_level = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[profile]\nenergy_level = 11\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Toml(_))));
    }

    #[test]
    fn test_request_context_from_profile() {
        let profile = ProfileConfig {
            fitness_level: FitnessLevel::NewToExercise,
            energy_level: 2,
            equipment: vec!["mat".into()],
        };
        let ctx = profile.request_context(20);
        assert_eq!(ctx.requested_duration_minutes, 20);
        assert_eq!(ctx.energy_level, 2);
        assert!(ctx.equipment.contains("mat"));
    }
}
