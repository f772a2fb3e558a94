//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::extract::{SectionKind, SectionTable};
use crate::core::lifecycle::LifecyclePolicy;
use crate::core::normalize::{Normalizer, DEFAULT_STOP_WORDS};
use crate::core::project::Project;
use crate::core::similarity::{DEFAULT_MAX_MATCHES, DEFAULT_THRESHOLD};
use crate::core::synthesize::ActionSynthesizer;

/// Errors found while validating configuration
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("similarity_threshold must be between 0 and 1 (got {0})")]
    ThresholdOutOfRange(f64),

    #[error("max_matches must be at least 1")]
    ZeroMaxMatches,

    #[error("section_header_synonyms for {0} is empty")]
    EmptySynonyms(SectionKind),
}

/// rcatrack configuration with layered hierarchy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default author for new records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Minimum score for a recurrence match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity_threshold: Option<f64>,

    /// Matches kept per incident
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_matches: Option<usize>,

    /// Let the owner verify their own action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_self_verification: Option<bool>,

    /// Replacement stop-word list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,

    /// Replacement header synonyms, per section
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub section_header_synonyms: BTreeMap<SectionKind, Vec<String>>,

    /// Due date offset for new actions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_due_days: Option<u32>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load_for(project: Option<&Project>) -> Self {
        // 1. Built-in defaults (already in Default impl)
        let mut config = Config::default();

        // 2. Global user config (~/.config/rcatrack/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Project config (.rca/config.yaml)
        if let Some(project) = project {
            if let Some(project_config) = Self::read_file(&project.rca_dir().join("config.yaml")) {
                config.merge(project_config);
            }
        }

        // 4. Environment variables
        config.apply_env(|key| std::env::var(key).ok());

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot read config file");
                return None;
            }
        };
        let has_content = contents.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#') && line != "---"
        });
        if !has_content {
            return Some(Config::default());
        }

        let parsed = serde_yml::from_str::<serde_yml::Value>(&contents).and_then(|value| {
            if value.is_null() {
                Ok(Config::default())
            } else {
                serde_yml::from_value::<Config>(value)
            }
        });
        match parsed {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(author) = var("RCATRACK_AUTHOR") {
            self.author = Some(author);
        }
        if let Some(threshold) = var("RCATRACK_THRESHOLD") {
            match threshold.trim().parse::<f64>() {
                Ok(value) => self.similarity_threshold = Some(value),
                Err(_) => tracing::warn!(value = %threshold, "ignoring invalid RCATRACK_THRESHOLD"),
            }
        }
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rcatrack")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.author.is_some() {
            self.author = other.author;
        }
        if other.similarity_threshold.is_some() {
            self.similarity_threshold = other.similarity_threshold;
        }
        if other.max_matches.is_some() {
            self.max_matches = other.max_matches;
        }
        if other.allow_self_verification.is_some() {
            self.allow_self_verification = other.allow_self_verification;
        }
        if other.stop_words.is_some() {
            self.stop_words = other.stop_words;
        }
        self.section_header_synonyms
            .extend(other.section_header_synonyms);
        if other.default_due_days.is_some() {
            self.default_due_days = other.default_due_days;
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.threshold();
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        if self.max_matches == Some(0) {
            return Err(ConfigError::ZeroMaxMatches);
        }
        for (kind, synonyms) in &self.section_header_synonyms {
            if synonyms.iter().all(|s| s.trim().is_empty()) {
                return Err(ConfigError::EmptySynonyms(*kind));
            }
        }
        Ok(())
    }

    /// Get the author name, falling back to git config or username
    pub fn author(&self) -> String {
        if let Some(ref author) = self.author {
            return author.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    pub fn threshold(&self) -> f64 {
        self.similarity_threshold.unwrap_or(DEFAULT_THRESHOLD)
    }

    pub fn max_matches(&self) -> usize {
        self.max_matches.unwrap_or(DEFAULT_MAX_MATCHES)
    }

    pub fn normalizer(&self) -> Normalizer {
        match &self.stop_words {
            Some(words) => Normalizer::new(words),
            None => Normalizer::default(),
        }
    }

    pub fn section_table(&self) -> SectionTable {
        SectionTable::with_overrides(&self.section_header_synonyms)
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            allow_self_verification: self.allow_self_verification.unwrap_or(false),
        }
    }

    pub fn synthesizer(&self) -> ActionSynthesizer {
        ActionSynthesizer::new(self.default_due_days)
    }

    /// Fully resolved settings, for display
    pub fn effective(&self) -> EffectiveConfig {
        let section_header_synonyms = SectionKind::all()
            .iter()
            .map(|kind| {
                let synonyms = self
                    .section_header_synonyms
                    .get(kind)
                    .cloned()
                    .unwrap_or_else(|| {
                        kind.default_synonyms().iter().map(|s| s.to_string()).collect()
                    });
                (*kind, synonyms)
            })
            .collect();

        EffectiveConfig {
            author: self.author(),
            similarity_threshold: self.threshold(),
            max_matches: self.max_matches(),
            allow_self_verification: self.lifecycle_policy().allow_self_verification,
            default_due_days: self.default_due_days,
            stop_words: self
                .stop_words
                .clone()
                .unwrap_or_else(|| DEFAULT_STOP_WORDS.iter().map(|s| s.to_string()).collect()),
            section_header_synonyms,
        }
    }
}

/// Configuration with every default filled in
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub author: String,
    pub similarity_threshold: f64,
    pub max_matches: usize,
    pub allow_self_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_due_days: Option<u32>,
    pub stop_words: Vec<String>,
    pub section_header_synonyms: BTreeMap<SectionKind, Vec<String>>,
}
