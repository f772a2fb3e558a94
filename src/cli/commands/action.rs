//! `rca action` command - Remedial action tracking

use chrono::{Local, NaiveDate};
use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::helpers::{format_short_id, open_tracker, print_serialized};
use crate::cli::table::{CellValue, ColumnDef, TableConfig, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::lifecycle::{ActionDetails, Transition};
use crate::core::store::{FileStore, RecordStore};
use crate::core::tracker::RcaTracker;
use crate::entities::action::{ActionStatus, Evidence, RemedialAction};

#[derive(Subcommand, Debug)]
pub enum ActionCommands {
    /// List remedial actions with filtering
    List(ListArgs),

    /// Show an action's details
    Show(ShowArgs),

    /// Assign an owner (starts work on open actions)
    Assign(AssignArgs),

    /// Start work on an assigned action
    Start(ActionRef),

    /// Set or clear the due date
    Due(DueArgs),

    /// Set the owning team, verification method or notes
    Set(SetArgs),

    /// Submit evidence of completion
    Evidence(EvidenceArgs),

    /// Verify submitted evidence and close the action
    Verify(VerifyArgs),

    /// Reject submitted evidence
    Reject(RejectArgs),

    /// Reopen a rejected action
    Reopen(ActionRef),
}

/// Column definitions for action list output
const ACTION_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("id", "ID", 17),
    ColumnDef::new("rca", "RCA", 17),
    ColumnDef::new("seq", "#", 4),
    ColumnDef::new("description", "DESCRIPTION", 40),
    ColumnDef::new("status", "STATUS", 20),
    ColumnDef::new("owner", "OWNER", 16),
    ColumnDef::new("due", "DUE", 12),
];

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only actions of this RCA (ID or unique prefix)
    #[arg(long)]
    pub rca: Option<String>,

    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<ActionStatus>,

    /// Show only actions that are not verified
    #[arg(long)]
    pub open: bool,

    /// Show only actions past their due date
    #[arg(long)]
    pub overdue: bool,

    /// Filter by owner (case-insensitive)
    #[arg(long)]
    pub owner: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Action ID or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ActionRef {
    /// Action ID or unique prefix
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct AssignArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Person responsible for the action
    pub owner: String,
}

#[derive(clap::Args, Debug)]
pub struct DueArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Due date (YYYY-MM-DD), or "none" to clear
    pub date: String,
}

#[derive(clap::Args, Debug)]
#[command(group(
    clap::ArgGroup::new("details")
        .required(true)
        .multiple(true)
        .args(["team", "method", "notes"])
))]
pub struct SetArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Team responsible for the action ("" to clear)
    #[arg(long)]
    pub team: Option<String>,

    /// How completion will be verified ("" to clear)
    #[arg(long)]
    pub method: Option<String>,

    /// Free-form notes ("" to clear)
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(clap::Args, Debug)]
#[command(group(
    clap::ArgGroup::new("evidence")
        .required(true)
        .args(["text", "attachment"])
))]
pub struct EvidenceArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Free-text description of what was done
    #[arg(long)]
    pub text: Option<String>,

    /// Reference to an attached file or document
    #[arg(long)]
    pub attachment: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct VerifyArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Verifier (default: configured author)
    #[arg(long)]
    pub by: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct RejectArgs {
    /// Action ID or unique prefix
    pub id: String,

    /// Why the evidence is not sufficient
    #[arg(long, short = 'r')]
    pub reason: String,

    /// Reviewer (default: configured author)
    #[arg(long)]
    pub by: Option<String>,
}

pub fn run(cmd: ActionCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ActionCommands::List(args) => run_list(args, global),
        ActionCommands::Show(args) => run_show(args, global),
        ActionCommands::Assign(args) => apply(
            &args.id,
            Transition::Assign { owner: args.owner },
            global,
        ),
        ActionCommands::Start(args) => apply(&args.id, Transition::Start, global),
        ActionCommands::Due(args) => {
            let due = parse_due(&args.date)?;
            apply(&args.id, Transition::SetDueDate(due), global)
        }
        ActionCommands::Set(args) => {
            let details = ActionDetails {
                owner_team: args.team,
                verification_method: args.method,
                notes: args.notes,
            };
            if details.is_empty() {
                return Err(miette::miette!("Provide --team, --method or --notes"));
            }
            apply(&args.id, Transition::SetDetails(details), global)
        }
        ActionCommands::Evidence(args) => {
            let evidence = match (args.text, args.attachment) {
                (Some(text), _) => Evidence::Text(text),
                (None, Some(reference)) => Evidence::Attachment(reference),
                (None, None) => return Err(miette::miette!("Provide --text or --attachment")),
            };
            apply(&args.id, Transition::SubmitEvidence(evidence), global)
        }
        ActionCommands::Verify(args) => {
            let tracker = open_tracker(global)?;
            let verifier = args.by.unwrap_or_else(|| tracker.settings().author.clone());
            apply_with(&tracker, &args.id, Transition::Verify { verifier }, global)
        }
        ActionCommands::Reject(args) => {
            let tracker = open_tracker(global)?;
            let rejected_by = args.by.unwrap_or_else(|| tracker.settings().author.clone());
            apply_with(
                &tracker,
                &args.id,
                Transition::Reject {
                    reason: args.reason,
                    rejected_by,
                },
                global,
            )
        }
        ActionCommands::Reopen(args) => apply(&args.id, Transition::Resubmit, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let store = tracker.store();

    let rca = match args.rca {
        Some(ref query) => Some(
            store
                .load_rca(query)
                .map_err(|e| miette::miette!("{}", e))?
                .id,
        ),
        None => None,
    };

    let today = Local::now().date_naive();
    let actions: Vec<RemedialAction> = store
        .list_actions(rca.as_ref())
        .map_err(|e| miette::miette!("{}", e))?
        .into_iter()
        .filter(|a| args.status.is_none_or(|s| a.status == s))
        .filter(|a| !args.open || !a.status.is_closed())
        .filter(|a| !args.overdue || a.is_overdue(today))
        .filter(|a| {
            args.owner.as_ref().is_none_or(|owner| {
                a.owner
                    .as_ref()
                    .is_some_and(|o| o.to_lowercase() == owner.to_lowercase())
            })
        })
        .collect();

    if print_serialized(&actions, global.format)? {
        return Ok(());
    }

    let rows = actions.iter().map(|a| {
        TableRow::new(a.id.to_string())
            .cell("id", CellValue::Id(a.id.to_string()))
            .cell("rca", CellValue::Id(a.source_rca.to_string()))
            .cell("seq", CellValue::Number(i64::from(a.sequence)))
            .cell("description", CellValue::Text(a.description.clone()))
            .cell("status", CellValue::Status(a.status))
            .cell(
                "owner",
                a.owner
                    .clone()
                    .map_or(CellValue::Empty, CellValue::Text),
            )
            .cell("due", CellValue::Due(a.due_date, a.is_overdue(today)))
    });

    let config = if global.quiet {
        TableConfig::for_pipe()
    } else {
        TableConfig::default()
    };
    TableFormatter::new(ACTION_COLUMNS, "action")
        .with_config(config)
        .output(rows, global.format);
    Ok(())
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    let action = tracker
        .store()
        .load_action(&args.id)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", action.id);
        return Ok(());
    }
    if print_serialized(&action, global.format)? {
        return Ok(());
    }

    let source_title = tracker
        .source_of(&action)
        .map(|rca| rca.title)
        .unwrap_or_else(|_| "(missing)".to_string());
    let today = Local::now().date_naive();

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(action.id.to_string()).cyan());
    println!(
        "{}: {} \"{}\" (#{})",
        style("RCA").bold(),
        style(format_short_id(&action.source_rca)).cyan(),
        source_title,
        action.sequence
    );
    println!("{}: {}", style("Status").bold(), action.status);
    println!(
        "{}: {}",
        style("Owner").bold(),
        action.owner.as_deref().unwrap_or("-")
    );
    if let Some(ref team) = action.owner_team {
        println!("{}: {}", style("Team").bold(), team);
    }
    match action.due_date {
        Some(due) if action.is_overdue(today) => println!(
            "{}: {} {}",
            style("Due").bold(),
            due,
            style("(overdue)").red().bold()
        ),
        Some(due) => println!("{}: {}", style("Due").bold(), due),
        None => {}
    }
    println!("{}", style("─".repeat(60)).dim());

    println!();
    println!("{}", style("Description:").bold());
    println!("{}", action.description);

    if let Some(ref method) = action.verification_method {
        println!();
        println!("{}: {}", style("Verification method").bold(), method);
    }
    if let Some(ref evidence) = action.evidence {
        println!();
        println!("{}: {}", style("Evidence").bold(), evidence);
        if let Some(at) = action.evidence_submitted_at {
            println!("   submitted {}", at.format("%Y-%m-%d %H:%M"));
        }
    }
    if let (Some(ref by), Some(at)) = (&action.verified_by, action.verified_at) {
        println!(
            "{}: {} on {}",
            style("Verified by").bold(),
            by,
            at.format("%Y-%m-%d %H:%M")
        );
    }

    if !action.rejections.is_empty() {
        println!();
        println!("{} ({}):", style("Rejections").bold(), action.rejections.len());
        for rejection in &action.rejections {
            println!(
                "  {} {}: {}",
                rejection.timestamp.format("%Y-%m-%d"),
                rejection.rejector,
                rejection.reason
            );
        }
    }

    if let Some(ref notes) = action.notes {
        println!();
        println!("{}", style("Notes:").bold());
        println!("{}", notes);
    }

    let next = tracker.settings().lifecycle.legal_transitions(action.status);
    if !next.is_empty() {
        let names: Vec<String> = next.iter().map(ToString::to_string).collect();
        println!();
        println!("{}: {}", style("Next").bold(), names.join(", "));
    }

    println!();
    println!(
        "{}: {} {} | {}: {}",
        style("Author").bold(),
        action.author,
        style(action.created.format("%Y-%m-%d %H:%M")).dim(),
        style("Revision").bold(),
        action.entity_revision
    );
    Ok(())
}

fn apply(id: &str, transition: Transition, global: &GlobalOpts) -> Result<()> {
    let tracker = open_tracker(global)?;
    apply_with(&tracker, id, transition, global)
}

fn apply_with(
    tracker: &RcaTracker<FileStore>,
    id: &str,
    transition: Transition,
    global: &GlobalOpts,
) -> Result<()> {
    let name = transition.name();
    let action = tracker
        .transition(id, transition)
        .map_err(|e| miette::miette!("{}", e))?;

    if global.format == OutputFormat::Id {
        println!("{}", action.id);
        return Ok(());
    }
    if print_serialized(&action, global.format)? {
        return Ok(());
    }

    println!(
        "{} {} {} -> {}",
        style("✓").green(),
        past_tense(name),
        style(format_short_id(&action.id)).cyan(),
        style(action.status).yellow()
    );
    Ok(())
}

fn past_tense(transition: &str) -> &'static str {
    match transition {
        "assign" => "Assigned",
        "start" => "Started",
        "submit_evidence" => "Submitted evidence for",
        "verify" => "Verified",
        "reject" => "Rejected",
        "resubmit" => "Reopened",
        "set_due_date" => "Updated due date of",
        "set_details" => "Updated details of",
        _ => "Updated",
    }
}

fn parse_due(value: &str) -> Result<Option<NaiveDate>> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| miette::miette!("Invalid due date '{}'. Use YYYY-MM-DD or 'none'", value))
}
