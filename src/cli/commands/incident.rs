//! `rca incident` command - Recurrence checks against past RCAs

use clap::Subcommand;
use console::style;
use miette::Result;
use std::path::PathBuf;

use crate::cli::helpers::{format_score, format_short_id, open_tracker, print_serialized, read_text};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::entity::Entity;
use crate::core::store::{FileStore, RecordStore};
use crate::core::tracker::RcaTracker;
use crate::entities::incident::IncidentReport;

#[derive(Subcommand, Debug)]
pub enum IncidentCommands {
    /// Record an incident and list the RCAs it resembles
    Check(CheckArgs),

    /// List recorded incidents
    List(ListArgs),

    /// Show an incident and its matched RCAs
    Show(IncidentRef),

    /// Recompute an incident's matches against the current RCA corpus
    Refresh(IncidentRef),
}

/// Column definitions for match output
const MATCH_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("rank", "#", 3),
    ColumnDef::new("score", "SCORE", 6),
    ColumnDef::new("id", "RCA", 17),
    ColumnDef::new("title", "TITLE", 30),
    ColumnDef::new("root-cause", "ROOT CAUSE", 40),
];

/// Column definitions for incident list output
const INCIDENT_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 17),
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("top", "TOP", 6),
    ColumnDef::new("reported", "REPORTED", 12),
];

#[derive(clap::Args, Debug)]
#[command(group(
    clap::ArgGroup::new("input")
        .required(true)
        .args(["text", "file"])
))]
pub struct CheckArgs {
    /// Incident description
    pub text: Option<String>,

    /// Read the description from a file ("-" reads stdin)
    #[arg(long, short = 'F')]
    pub file: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show only incidents that matched a past RCA
    #[arg(long)]
    pub recurrent: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct IncidentRef {
    /// Incident ID or unique prefix
    pub id: String,
}

pub fn run(cmd: IncidentCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        IncidentCommands::Check(args) => run_check(args, global),
        IncidentCommands::List(args) => run_list(args, global),
        IncidentCommands::Show(args) => run_show(args, global),
        IncidentCommands::Refresh(args) => run_refresh(args, global),
    }
}

fn run_check(args: CheckArgs, global: &GlobalOpts) -> Result<()> {
    let text = match (args.text, args.file) {
        (Some(text), _) => text,
        (None, Some(path)) => read_text(&path)?,
        (None, None) => return Err(miette::miette!("Provide incident text or --file")),
    };

    let tracker = open_tracker(global)?;
    let incident = tracker
        .check_incident(&text)
        .map_err(|e| miette::miette!("{}", e))?;
    report(&tracker, &incident, global)
}

fn run_refresh(args: IncidentRef, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let incident = tracker
        .refresh_incident(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;
    report(&tracker, &incident, global)
}

fn run_show(args: IncidentRef, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let incident = tracker
        .store()
        .load_incident(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", incident.id);
        return Ok(());
    }
    if print_serialized(&incident, global.format)? {
        return Ok(());
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(incident.id.to_string()).cyan());
    println!("{}: {}", style("Title").bold(), style(&incident.title).yellow());
    println!("{}: {}", style("Status").bold(), incident.status());
    println!(
        "{}: {} by {}",
        style("Reported").bold(),
        incident.reported_at.format("%Y-%m-%d %H:%M"),
        incident.author
    );
    if let (Some(at), Some(threshold)) = (incident.matched_at, incident.threshold) {
        println!(
            "{}: {} (threshold {})",
            style("Matched").bold(),
            at.format("%Y-%m-%d %H:%M"),
            format_score(threshold)
        );
    }
    println!("{}", style("─".repeat(60)).dim());
    println!();
    println!("{}", style("Description:").bold());
    println!("{}", incident.raw_text.trim_end());
    println!();

    print_matches(&tracker, &incident, OutputFormat::Tsv, global.quiet);
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let mut incidents: Vec<IncidentReport> = tracker
        .store()
        .list_incidents()
        .map_err(|e| miette::miette!("{}", e))?
        .into_iter()
        .filter(|i| !args.recurrent || !i.matched_rca_candidates.is_empty())
        .collect();
    incidents.sort_by(|a, b| a.reported_at.cmp(&b.reported_at));
    if let Some(limit) = args.limit {
        incidents.truncate(limit);
    }

    if print_serialized(&incidents, global.format)? {
        return Ok(());
    }

    let rows = incidents.iter().map(|i| {
        TableRow::new(i.id.to_string())
            .cell("id", CellValue::Id(i.id.to_string()))
            .cell("title", CellValue::Text(i.title.clone()))
            .cell("status", CellValue::Label(i.status()))
            .cell(
                "top",
                i.top_match()
                    .map_or(CellValue::Empty, |m| CellValue::Score(m.score)),
            )
            .cell("reported", CellValue::Date(i.reported_at))
    });

    let config = if global.quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(INCIDENT_COLUMNS, "incident")
        .with_config(config)
        .output(rows, global.format);
    Ok(())
}

fn report(
    tracker: &RcaTracker<FileStore>,
    incident: &IncidentReport,
    global: &GlobalOpts,
) -> Result<()> {
    match global.format {
        OutputFormat::Id => {
            for candidate in &incident.matched_rca_candidates {
                println!("{}", candidate.rca_id);
            }
            return Ok(());
        }
        format => {
            if print_serialized(incident, format)? {
                return Ok(());
            }
        }
    }

    if !global.quiet {
        println!(
            "{} Recorded incident {}",
            style("✓").green(),
            style(format_short_id(&incident.id)).cyan()
        );
        println!();
    }
    print_matches(tracker, incident, global.format, global.quiet);
    Ok(())
}

fn print_matches(
    tracker: &RcaTracker<FileStore>,
    incident: &IncidentReport,
    format: OutputFormat,
    quiet: bool,
) {
    if incident.matched_rca_candidates.is_empty() {
        println!("No similar incidents found.");
        return;
    }

    let rows = incident
        .matched_rca_candidates
        .iter()
        .enumerate()
        .map(|(rank, candidate)| {
            // An RCA file removed since matching still shows its id and score
            let rca = tracker
                .store()
                .load_rca(&candidate.rca_id.to_string())
                .ok();
            let title = rca.as_ref().map(|r| r.title.clone());
            let root_cause = rca
                .as_ref()
                .and_then(|r| r.root_cause().map(String::from));

            TableRow::new(candidate.rca_id.to_string())
                .cell("rank", CellValue::Number(rank as i64 + 1))
                .cell("score", CellValue::Score(candidate.score))
                .cell("id", CellValue::Id(candidate.rca_id.to_string()))
                .cell("title", title.map_or(CellValue::Empty, CellValue::Text))
                .cell(
                    "root-cause",
                    root_cause.map_or(CellValue::Empty, CellValue::Text),
                )
        });

    let config = if quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(MATCH_COLUMNS, "match")
        .with_config(config)
        .output(rows, format);
}
