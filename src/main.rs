use clap::Parser;
use miette::Result;
use rcatrack::cli::{Cli, Commands};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE so piping to `head` or `grep -q` exits quietly instead of panicking
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let global = cli.global;
    init_logging(global.verbose);

    match cli.command {
        Commands::Init(args) => rcatrack::cli::commands::init::run(args),
        Commands::Doc(cmd) => rcatrack::cli::commands::doc::run(cmd, &global),
        Commands::Action(cmd) => rcatrack::cli::commands::action::run(cmd, &global),
        Commands::Incident(cmd) => rcatrack::cli::commands::incident::run(cmd, &global),
        Commands::Config(cmd) => rcatrack::cli::commands::config::run(cmd, &global),
        Commands::Completions(args) => rcatrack::cli::commands::completions::run(args),
    }
}

/// Log to stderr; RCATRACK_LOG takes precedence over RUST_LOG
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("rcatrack=debug")
    } else {
        EnvFilter::try_from_env("RCATRACK_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
