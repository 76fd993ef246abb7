//! cfpack command-line interface
//!
//! Builds CFEngine policy sets from catalog, local and remote modules.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use output::{resolve_color_choice, StyledOutput};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cfpack")]
#[command(about = "Build CFEngine policy sets from reusable modules", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory
    #[arg(long, default_value = ".", global = true)]
    dir: PathBuf,

    /// Set log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// When to use colors (auto, always, never)
    #[arg(long, global = true)]
    color: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new cfpack.json
    Init {
        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Add modules to the build
    Add {
        /// Module names, local paths, or a remote source followed by module names
        #[arg(required = true)]
        modules: Vec<String>,

        /// Add everything a remote source provides without asking
        #[arg(long)]
        non_interactive: bool,

        /// Expected SHA-256 of an archive source
        #[arg(long)]
        checksum: Option<String>,

        /// Module index to use instead of the project's
        #[arg(long)]
        index: Option<String>,
    },

    /// Show the modules in the build
    Status,

    /// Search the module index
    Search {
        /// Text to look for in module names and descriptions
        term: Option<String>,

        /// Module index to search
        #[arg(long)]
        index: Option<String>,
    },
}

fn initialize_tracing(log_level: &LogLevel) {
    let filter = EnvFilter::new(log_level.to_filter_directive());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    initialize_tracing(&cli.log_level);
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));
    tracing::debug!(dir = %cli.dir.display(), command = ?cli.command, "starting");

    let result = match cli.command {
        Commands::Init { name } => commands::init::execute(&cli.dir, name.as_deref(), &mut out),
        Commands::Add {
            modules,
            non_interactive,
            checksum,
            index,
        } => commands::add::execute(
            &cli.dir,
            &modules,
            non_interactive,
            checksum,
            index.as_deref(),
            &mut out,
        ),
        Commands::Status => commands::status::execute(&cli.dir, &mut out),
        Commands::Search { term, index } => {
            commands::search::execute(&cli.dir, term.as_deref(), index.as_deref(), &mut out)
        }
    };

    if let Err(e) = result {
        out.report_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}
