//! `rca config` command - Inspect the effective configuration

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::print_serialized;
use crate::cli::GlobalOpts;
use crate::core::project::Project;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values
    Show(ShowArgs),

    /// Show paths to configuration files
    Path,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Path => run_path(global),
    }
}

fn find_project(global: &GlobalOpts) -> Option<Project> {
    match &global.project {
        Some(path) => Project::discover_from(path).ok(),
        None => Project::discover().ok(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let project = find_project(global);
    let config = Config::load_for(project.as_ref());
    config.validate().map_err(|e| miette::miette!("{}", e))?;
    let effective = config.effective();

    if let Some(key) = &args.key {
        let values = serde_json::to_value(&effective).into_diagnostic()?;
        let value = values
            .get(key)
            .ok_or_else(|| miette::miette!("Unknown configuration key '{}'", key))?;
        match value {
            serde_json::Value::String(s) => println!("{}", s),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                print!("{}", serde_yml::to_string(value).into_diagnostic()?)
            }
            other => println!("{}", other),
        }
        return Ok(());
    }

    if print_serialized(&effective, global.format)? {
        return Ok(());
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    println!("  {}: {}", style("author").cyan(), effective.author);
    println!(
        "  {}: {}",
        style("similarity_threshold").cyan(),
        effective.similarity_threshold
    );
    println!("  {}: {}", style("max_matches").cyan(), effective.max_matches);
    println!(
        "  {}: {}",
        style("allow_self_verification").cyan(),
        effective.allow_self_verification
    );
    match effective.default_due_days {
        Some(days) => println!("  {}: {}", style("default_due_days").cyan(), days),
        None => println!("  {}: {}", style("default_due_days").cyan(), style("(not set)").dim()),
    }
    println!(
        "  {}: {} word(s)",
        style("stop_words").cyan(),
        effective.stop_words.len()
    );
    println!("  {}:", style("section_header_synonyms").cyan());
    for (kind, synonyms) in &effective.section_header_synonyms {
        println!("    {}: {}", kind, synonyms.join(", "));
    }

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Environment variables (RCATRACK_AUTHOR, RCATRACK_THRESHOLD)");
    println!("  2. Project config (.rca/config.yaml)");
    println!("  3. Global config (~/.config/rcatrack/config.yaml)");
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => {
            println!("  {} {}", style("Global:").cyan(), path.display());
            print_existence(path.exists(), 9);
        }
        None => println!(
            "  {} {}",
            style("Global:").cyan(),
            style("(no home directory)").dim()
        ),
    }

    println!();
    match find_project(global) {
        Some(project) => {
            let path = project.rca_dir().join("config.yaml");
            println!("  {} {}", style("Project:").cyan(), path.display());
            print_existence(path.exists(), 10);
        }
        None => println!(
            "  {} {}",
            style("Project:").cyan(),
            style("(not in an rcatrack project)").dim()
        ),
    }
    Ok(())
}

fn print_existence(exists: bool, indent: usize) {
    let label = if exists {
        style("(exists)").green()
    } else {
        style("(not created)").dim()
    };
    println!("{}{}", " ".repeat(indent), label);
}
