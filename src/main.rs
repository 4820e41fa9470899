#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use nightly_history::config::Config;
use nightly_history::{HistoryResult, export_cmd, list_cmd, refresh_cmd};

#[derive(Parser, Debug)]
#[command(name = "nightly-history")]
#[command(about = "Nightly batch run history built from channel notifications", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set NIGHTLY_HISTORY_LOG)
    #[arg(long)]
    verbose: bool,

    /// Path to a TOML config file (defaults to ./nightly-history.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History file (overrides config and NIGHTLY_HISTORY_FILE)
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch events from the feed, parse them and merge into the history
    Refresh {
        /// Directory holding exported channel-history pages
        #[arg(long)]
        feed_dir: Option<PathBuf>,
        /// Channel to read
        #[arg(long)]
        channel: Option<String>,
    },

    /// Print the stored history as JSON
    List {
        /// Only records for this workflow
        #[arg(long)]
        workflow: Option<String>,
    },

    /// Print the distinct workflow names as JSON
    Workflows,

    /// Export the stored history as CSV
    Export {
        /// Output file (stdout when omitted)
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("NIGHTLY_HISTORY_LOG").unwrap_or_else(|_| {
        if verbose {
            "nightly_history=debug".to_string()
        } else {
            "nightly_history=info".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn run(cli: Cli) -> HistoryResult<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(history) = cli.history {
        config.history_path = history;
    }

    match cli.command {
        Commands::Refresh { feed_dir, channel } => {
            if let Some(dir) = feed_dir {
                config.feed_dir = dir;
            }
            if let Some(channel) = channel {
                config.channel = channel;
            }
            config.validate()?;
            refresh_cmd::run(config).map(|_| ())
        }
        Commands::List { workflow } => list_cmd::list(&config, workflow.as_deref()),
        Commands::Workflows => list_cmd::workflows(&config),
        Commands::Export { csv } => export_cmd::run(&config, csv).map(|_| ()),
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}
