//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::store::FileStore;
use crate::core::tracker::{RcaTracker, TrackerSettings};
use crate::core::Config;

/// Format an EntityId for display, truncating if too long
///
/// IDs longer than 16 characters are truncated to 13 chars with "..." suffix.
/// This provides a consistent display format across all list/table outputs.
pub fn format_short_id(id: &EntityId) -> String {
    let s = id.to_string();
    if s.len() > 16 {
        format!("{}...", &s[..13])
    } else {
        s
    }
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Locate the project from `--project` or by walking up from the current directory
pub fn open_project(global: &GlobalOpts) -> Result<Project> {
    let project = match &global.project {
        Some(path) => Project::discover_from(path),
        None => Project::discover(),
    };
    project.map_err(|e| miette::miette!("{}", e))
}

/// Load and validate the configuration of a project
pub fn load_config(project: &Project) -> Result<Config> {
    let config = Config::load_for(Some(project));
    config.validate().map_err(|e| miette::miette!("{}", e))?;
    Ok(config)
}

/// Open the project's tracker with its effective configuration
pub fn open_tracker(global: &GlobalOpts) -> Result<RcaTracker<FileStore>> {
    let project = open_project(global)?;
    let config = load_config(&project)?;
    let settings = TrackerSettings::from_config(&config);
    RcaTracker::open(FileStore::new(project), settings).map_err(|e| miette::miette!("{}", e))
}

/// Read text from a file, or from stdin when the path is "-"
pub fn read_text(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .into_diagnostic()?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))
}

/// Print a record as YAML or JSON; returns false for other formats
pub fn print_serialized<T: Serialize>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Yaml => {
            let yaml = serde_yml::to_string(value).into_diagnostic()?;
            print!("{}", yaml);
            Ok(true)
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value).into_diagnostic()?;
            println!("{}", json);
            Ok(true)
        }
        _ => Ok(false),
    }
}

/// Round a similarity score for display
pub fn format_score(score: f64) -> String {
    format!("{:.2}", score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;

    #[test]
    fn test_format_short_id() {
        let id = EntityId::new(EntityPrefix::Act);
        let formatted = format_short_id(&id);
        // ULID IDs are 30 chars (3 prefix + 1 dash + 26 ULID), so should truncate
        assert!(formatted.len() <= 16);
        assert!(formatted.ends_with("..."));
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("émigré café", 6), "émi...");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(0.40451), "0.40");
        assert_eq!(format_score(1.0), "1.00");
    }
}
