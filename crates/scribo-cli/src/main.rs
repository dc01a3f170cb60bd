mod commands;
mod output;
mod workspace;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::analyze::AnalyzeArgs;
use commands::cache::CacheAction;
use commands::config::ConfigArgs;
use commands::rules::RulesAction;
use scribo_core::{ChecklistItem, Guideline};
use workspace::Workspace;

#[derive(Parser, Debug)]
#[command(name = "scribo", author, version, about = "Review writing against guidelines and a checklist")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Data directory holding settings and stored state [default: ~/.scribo]
    #[arg(long, global = true, env = "SCRIBO_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a markdown document
    Analyze(AnalyzeArgs),

    /// Manage writing guidelines
    Guidelines {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Manage checklist items
    Checklist {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Manage cached analysis results
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show or update AI provider settings
    Config(ConfigArgs),
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let workspace = Workspace::new(cli.data_dir);
    tracing::debug!(data_dir = %workspace.data_dir().display(), "using data directory");

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(&workspace, args).await,
        Commands::Guidelines { action } => commands::rules::run::<Guideline>(&workspace, action),
        Commands::Checklist { action } => commands::rules::run::<ChecklistItem>(&workspace, action),
        Commands::Cache { action } => commands::cache::run(&workspace, action),
        Commands::Config(args) => commands::config::run(&workspace, args),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
