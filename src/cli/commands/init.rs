//! `rca init` command - Initialize a new rcatrack project

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::core::identity::EntityPrefix;
use crate::core::project::{Project, ProjectError, PROJECT_DIR};

#[derive(clap::Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Repair the project structure even if .rca/ already exists; an existing
    /// config file is kept
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: InitArgs) -> Result<()> {
    let path = if args.path.as_os_str() == "." {
        std::env::current_dir().into_diagnostic()?
    } else {
        args.path.clone()
    };

    if !path.exists() {
        std::fs::create_dir_all(&path).into_diagnostic()?;
        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(path.display()).cyan()
        );
    }

    let config_kept = args.force && path.join(PROJECT_DIR).join("config.yaml").exists();
    let project = if args.force {
        Project::init_force(&path)
    } else {
        Project::init(&path)
    };

    match project {
        Ok(project) => {
            println!(
                "{} Initialized rcatrack project at {}",
                style("✓").green(),
                style(project.root().display()).cyan()
            );
            if config_kept {
                println!(
                    "{} Kept existing {}/config.yaml",
                    style("!").yellow(),
                    PROJECT_DIR
                );
            }
            println!();
            println!("Created project structure:");
            print_structure(project.root());
            println!();
            println!("Next steps:");
            println!(
                "  {} Ingest an RCA document",
                style("rca doc ingest report.txt").yellow()
            );
            println!(
                "  {} Review the synthesized actions",
                style("rca action list").yellow()
            );
            println!(
                "  {} Check a new incident for recurrence",
                style("rca incident check \"...\"").yellow()
            );
            Ok(())
        }
        Err(ProjectError::AlreadyExists(path)) => {
            println!(
                "{} rcatrack project already exists at {}",
                style("!").yellow(),
                style(path.display()).cyan()
            );
            println!();
            println!("Use {} to reinitialize", style("rca init --force").yellow());
            Ok(())
        }
        Err(e) => Err(miette::miette!("{}", e)),
    }
}

fn print_structure(root: &Path) {
    let config = format!("{}/config.yaml", PROJECT_DIR);
    let mut entries = vec![format!("{}/", PROJECT_DIR), config];
    entries.extend(
        EntityPrefix::all()
            .iter()
            .map(|prefix| format!("{}/", prefix.directory())),
    );

    for entry in entries {
        if root.join(&entry).exists() {
            let marker = if entry.ends_with('/') { "+" } else { "-" };
            println!("  {} {}", marker, style(entry).dim());
        }
    }
}
