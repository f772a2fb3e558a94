//! `rca doc` command - RCA document ingestion and inspection

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_short_id, open_tracker, print_serialized, read_text};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::store::RecordStore;
use crate::core::synthesize::Synthesis;
use crate::core::tracker::NewDocument;
use crate::entities::rca::{Environment, RcaDocument};

#[derive(Subcommand, Debug)]
pub enum DocCommands {
    /// Ingest an RCA document and synthesize its remedial actions
    Ingest(IngestArgs),

    /// List ingested RCA documents
    List(ListArgs),

    /// Show an RCA document with its extraction history
    Show(ShowArgs),

    /// Run field extraction again and merge any new actions
    Reextract(ReextractArgs),
}

/// Column definitions for RCA list output
const RCA_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 17),
    ColumnDef::new("title", "TITLE", 36),
    ColumnDef::new("status", "STATUS", 14),
    ColumnDef::new("actions", "ACTIONS", 8),
    ColumnDef::new("uploaded", "UPLOADED", 12),
];

#[derive(clap::Args, Debug)]
pub struct IngestArgs {
    /// Document to ingest (plain text; "-" reads stdin)
    pub file: PathBuf,

    /// Title (default: file name)
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// OEM / customer the RCA concerns
    #[arg(long)]
    pub oem: Option<String>,

    /// Environment the incident occurred in (pre_live, uat, production, testing)
    #[arg(long, short = 'e')]
    pub environment: Option<Environment>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show only documents flagged for review
    #[arg(long)]
    pub needs_review: bool,

    /// Filter by OEM (case-insensitive)
    #[arg(long)]
    pub oem: Option<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// RCA ID or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ReextractArgs {
    /// RCA ID or unique prefix
    pub id: String,
}

pub fn run(cmd: DocCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        DocCommands::Ingest(args) => run_ingest(args, global),
        DocCommands::List(args) => run_list(args, global),
        DocCommands::Show(args) => run_show(args, global),
        DocCommands::Reextract(args) => run_reextract(args, global),
    }
}

fn run_ingest(args: IngestArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let raw_text = read_text(&args.file)?;

    let title = args.title.unwrap_or_else(|| default_title(&args.file));
    let ingested = tracker
        .ingest(NewDocument {
            title,
            raw_text,
            oem: args.oem,
            environment: args.environment,
        })
        .map_err(|e| miette::miette!("{}", e))?;

    let rca = &ingested.rca;
    if global.format == OutputFormat::Id {
        println!("{}", rca.id);
        return Ok(());
    }
    if print_serialized(rca, global.format)? {
        return Ok(());
    }

    println!(
        "{} Ingested RCA {}",
        style("✓").green(),
        style(format_short_id(&rca.id)).cyan()
    );
    if global.quiet {
        return Ok(());
    }

    println!("   {}", style(&rca.title).yellow());
    match rca.root_cause() {
        Some(root_cause) => println!("   {}: {}", style("Root cause").bold(), root_cause),
        None => println!(
            "{} No root cause found; document flagged for review",
            style("!").yellow()
        ),
    }
    print_synthesis(&ingested.synthesis);
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let store = tracker.store();

    let mut rcas: Vec<RcaDocument> = store
        .list_rcas()
        .map_err(|e| miette::miette!("{}", e))?
        .into_iter()
        .filter(|rca| !args.needs_review || rca.needs_review())
        .filter(|rca| {
            args.oem.as_ref().is_none_or(|oem| {
                rca.oem
                    .as_ref()
                    .is_some_and(|o| o.eq_ignore_ascii_case(oem))
            })
        })
        .collect();
    rcas.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at));
    if let Some(limit) = args.limit {
        rcas.truncate(limit);
    }

    if print_serialized(&rcas, global.format)? {
        return Ok(());
    }

    let actions = store
        .list_actions(None)
        .map_err(|e| miette::miette!("{}", e))?;

    let rows = rcas.iter().map(|rca| {
        let count = actions.iter().filter(|a| a.source_rca == rca.id).count();
        TableRow::new(rca.id.to_string())
            .cell("id", CellValue::Id(rca.id.to_string()))
            .cell("title", CellValue::Text(rca.title.clone()))
            .cell("status", CellValue::Label(rca.status()))
            .cell("actions", CellValue::Number(count as i64))
            .cell("uploaded", CellValue::Date(rca.uploaded_at))
    });

    let config = if global.quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(RCA_COLUMNS, "rca")
        .with_config(config)
        .output(rows, global.format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let rca = tracker
        .store()
        .load_rca(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", rca.id);
        return Ok(());
    }
    if print_serialized(&rca, global.format)? {
        return Ok(());
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(rca.id.to_string()).cyan());
    println!("{}: {}", style("Title").bold(), style(&rca.title).yellow());
    println!("{}: {}", style("Status").bold(), rca.status());
    if let Some(ref oem) = rca.oem {
        println!("{}: {}", style("OEM").bold(), oem);
    }
    if let Some(environment) = rca.environment {
        println!("{}: {}", style("Environment").bold(), environment);
    }
    println!(
        "{}: {} by {}",
        style("Uploaded").bold(),
        rca.uploaded_at.format("%Y-%m-%d %H:%M"),
        rca.author
    );
    if let Some(current) = rca.current() {
        if let Some(ref date) = current.fields.incident_date {
            println!("{}: {}", style("Incident Date").bold(), date);
        }
        if let Some(ref services) = current.fields.services_affected {
            println!("{}: {}", style("Services Affected").bold(), services);
        }
    }
    println!("{}", style("─".repeat(60)).dim());

    if let Some(current) = rca.current() {
        let fields = &current.fields;
        println!();
        println!("{}", style("Root Cause:").bold());
        match fields.root_cause {
            Some(ref root_cause) => println!("{}", root_cause),
            None => println!("{}", style("(not found, needs review)").yellow()),
        }

        print_list("Long Term Solutions", &fields.long_term_solutions);
        if let Some(ref workaround) = fields.workaround {
            println!();
            println!("{}", style("Workaround:").bold());
            println!("{}", workaround);
        }
        if let Some(ref factors) = fields.contributing_factors {
            println!();
            println!("{}", style("Contributing Factors:").bold());
            println!("{}", factors);
        }
    }

    if rca.extractions.len() > 1 {
        println!();
        println!("{} ({}):", style("Extraction History").bold(), rca.extractions.len());
        for snapshot in &rca.extractions {
            println!(
                "  r{} {} {} solution(s){}",
                snapshot.revision,
                snapshot.extracted_at.format("%Y-%m-%d %H:%M"),
                snapshot.fields.long_term_solutions.len(),
                if snapshot.fields.needs_review {
                    style(" [needs review]").yellow().to_string()
                } else {
                    String::new()
                }
            );
        }
    }

    let actions = tracker
        .store()
        .list_actions(Some(&rca.id))
        .map_err(|e| miette::miette!("{}", e))?;
    if !actions.is_empty() {
        println!();
        println!("{} ({}):", style("Actions").bold(), actions.len());
        for action in &actions {
            println!(
                "  {}. {} [{}] {}",
                action.sequence,
                action.description,
                action.status,
                style(format_short_id(&action.id)).dim()
            );
        }
    }
    Ok(())
}

fn run_reextract(args: ReextractArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let outcome = tracker
        .reextract(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if print_serialized(&outcome.rca, global.format)? {
        return Ok(());
    }

    let revision = outcome.rca.current().map_or(0, |s| s.revision);
    println!(
        "{} Re-extracted RCA {} (revision {})",
        style("✓").green(),
        style(format_short_id(&outcome.rca.id)).cyan(),
        revision
    );
    if global.quiet {
        return Ok(());
    }

    if outcome.rca.needs_review() {
        println!(
            "{} No root cause found; document flagged for review",
            style("!").yellow()
        );
    }
    if outcome.synthesis.is_unchanged() {
        println!("   No change to remedial actions");
    } else {
        print_synthesis(&outcome.synthesis);
    }
    Ok(())
}

fn print_synthesis(synthesis: &Synthesis) {
    if synthesis.created.is_empty() && synthesis.retained.is_empty() {
        println!("   No long term solutions found; no actions created");
    }
    for action in &synthesis.created {
        println!(
            "   {} {} {}",
            style("+").green(),
            style(format_short_id(&action.id)).cyan(),
            action.description
        );
    }
    if !synthesis.retained.is_empty() {
        println!("   {} existing action(s) kept", synthesis.retained.len());
    }
    for id in &synthesis.stale {
        println!(
            "   {} {} no longer matches a long term solution",
            style("!").yellow(),
            style(format_short_id(id)).cyan()
        );
    }
}

fn print_list(heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!();
    println!("{}:", style(heading).bold());
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
}

fn default_title(path: &std::path::Path) -> String {
    if path.as_os_str() == "-" {
        return "Untitled".to_string();
    }
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| s.replace(['_', '-'], " "))
        .unwrap_or_else(|| "Untitled".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_default_title() {
        assert_eq!(default_title(Path::new("-")), "Untitled");
        assert_eq!(default_title(Path::new("docs/pump_outage-q3.txt")), "pump outage q3");
    }
}
