//! Run configuration loaded from YAML.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    scenario::{ScenarioKind, ScenarioParams},
};

fn default_width() -> u32 {
    10
}

fn default_height() -> u32 {
    10
}

fn default_initial_landholders() -> usize {
    20
}

fn default_ticks() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scenario: ScenarioKind,
    /// Overrides the scenario's default growth index when set.
    #[serde(default)]
    pub index_growth: Option<f64>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_initial_landholders")]
    pub initial_landholders: usize,
    pub seed: u64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Reproduces the historical B2 behaviour where the reserve-zone shrink
    /// pressure is computed and then discarded.
    #[serde(default)]
    pub legacy_reserve_pressure: bool,
    /// Reproduces the historical expand feedback that is overwritten with 1
    /// after the bands are evaluated, so past transactions never matter.
    #[serde(default)]
    pub legacy_expand_feedback: bool,
    /// Reproduces the historical buy decision that is immediately replaced
    /// by "stable", leaving the market without buyers.
    #[serde(default)]
    pub legacy_buy_intent: bool,
    /// Reproduces the historical B2 cut decision that is immediately
    /// replaced by keep.
    #[serde(default)]
    pub legacy_cut_intent: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ModelConfig {
    pub fn new(
        scenario: ScenarioKind,
        width: u32,
        height: u32,
        landholders: usize,
        seed: u64,
    ) -> Self {
        Self {
            name: None,
            scenario,
            index_growth: None,
            width,
            height,
            initial_landholders: landholders,
            seed,
            ticks: default_ticks(),
            legacy_reserve_pressure: false,
            legacy_expand_feedback: false,
            legacy_buy_intent: false,
            legacy_cut_intent: false,
            logging: LoggingConfig::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Rejects configurations the model cannot be built from.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.width == 0 || self.height == 0 {
            return Err(ModelError::EmptyGrid {
                width: self.width,
                height: self.height,
            });
        }
        if self.initial_landholders > self.capacity() {
            return Err(ModelError::TooManyLandholders {
                agents: self.initial_landholders,
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    /// Scenario table with the configured overrides applied.
    pub fn scenario_params(&self) -> ScenarioParams {
        let mut params = self.scenario.params().with_index_growth(self.index_growth);
        if self.legacy_reserve_pressure {
            params.reserve_pressure = 0.0;
        }
        params.neutral_expand_feedback = self.legacy_expand_feedback;
        params.discard_buy_intent = self.legacy_buy_intent;
        params.discard_cut_intent = self.legacy_cut_intent;
        params
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.scenario.name().to_string())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.unwrap_or(self.ticks)
    }
}

pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<ModelConfig> {
        let path = self.base_dir.join(file.as_ref());
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: ModelConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_with_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "scenario: A1\nseed: 9\nwidth: 4\nheight: 5").unwrap();
        let loader = ConfigLoader::new(file.path().parent().unwrap());
        let config = loader.load(file.path().file_name().unwrap()).unwrap();
        assert_eq!(config.scenario, ScenarioKind::A1);
        assert_eq!(config.capacity(), 20);
        assert_eq!(config.initial_landholders, 20);
        assert_eq!(config.logging.level, "info");
        assert!(!config.legacy_reserve_pressure);
        assert_eq!(config.scenario_params().index_growth, 0.3);
    }

    #[test]
    fn rejects_more_landholders_than_cells() {
        let config = ModelConfig::new(ScenarioKind::Basic, 2, 2, 5, 1);
        assert_eq!(
            config.validate(),
            Err(ModelError::TooManyLandholders {
                agents: 5,
                capacity: 4
            })
        );
    }

    #[test]
    fn loader_reports_invalid_files() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "seed: 1\nwidth: 1\nheight: 1\ninitial_landholders: 3").unwrap();
        let loader = ConfigLoader::new(file.path().parent().unwrap());
        let err = loader.load(file.path().file_name().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("do not fit"));
    }

    #[test]
    fn legacy_flag_discards_reserve_pressure() {
        let mut config = ModelConfig::new(ScenarioKind::B2, 3, 3, 2, 1);
        assert_eq!(config.scenario_params().reserve_pressure, 1.0);
        config.legacy_reserve_pressure = true;
        assert_eq!(config.scenario_params().reserve_pressure, 0.0);
    }

    #[test]
    fn legacy_overwrites_are_off_unless_requested() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "scenario: B2\nseed: 3\nlegacy_expand_feedback: true\nlegacy_cut_intent: true"
        )
        .unwrap();
        let loader = ConfigLoader::new(file.path().parent().unwrap());
        let params = loader
            .load(file.path().file_name().unwrap())
            .unwrap()
            .scenario_params();
        assert!(params.neutral_expand_feedback);
        assert!(params.discard_cut_intent);
        assert!(!params.discard_buy_intent);

        let defaults = ModelConfig::new(ScenarioKind::B2, 3, 3, 2, 1).scenario_params();
        assert!(!defaults.neutral_expand_feedback);
        assert!(!defaults.discard_buy_intent);
        assert!(!defaults.discard_cut_intent);
    }
}
