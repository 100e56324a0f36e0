use clap::{Parser, Subcommand};
use clearcase_navigator::commands::*;
use clearcase_navigator::core::{
    command_init::CommandInit,
    config::Settings,
    error::Result,
    print_error,
};
use std::env;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clearcase-navigator")]
#[command(about = "ClearCase integration for editors and the command line")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file (default: <config dir>/clearcase-navigator/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rescan and list checked out, hijacked and view-private files
    Status,
    /// Show the version of a file in this view
    Version { file: PathBuf },
    /// Check out files
    Checkout {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Check in a file
    Checkin {
        file: PathBuf,
        /// Checkin comment (prompted for when the template needs one)
        #[arg(short = 'm', long = "message")]
        message: Option<String>,
    },
    /// Undo the checkout of a file, keeping a copy of the changes
    UndoCheckout {
        file: PathBuf,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Update a snapshot view (whole view when no path is given)
    Update { path: Option<PathBuf> },
    /// Show who changed each line of a file
    Annotate { file: PathBuf },
    /// Diff a file against its predecessor version
    Diff { file: PathBuf },
    /// Fetch a version of a file into the temp directory
    Get { file: PathBuf, version: String },
    /// Speak JSON lines on stdin/stdout for an editor
    Serve,
}

fn init_logging(debug: bool, settings: Option<&Settings>) {
    let level = if debug {
        "debug"
    } else {
        settings.map_or("info", |s| s.log_level.as_str())
    };
    // RUST_LOG still wins unless --debug was given
    let env = env_logger::Env::default().default_filter_or(level);
    let mut builder = env_logger::Builder::from_env(env);
    if debug {
        builder.parse_filters("debug");
    }
    builder.init();
}

fn run(cli: Cli, settings: Settings) -> Result<()> {
    let context = CommandInit::with_settings(env::current_dir()?, settings);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Status => execute_status(&context).await,
            Commands::Version { file } => execute_version(&context, &file).await,
            Commands::Checkout { files } => execute_checkout(&context, files).await,
            Commands::Checkin { file, message } => execute_checkin(&context, &file, message).await,
            Commands::UndoCheckout { file, yes } => execute_undo_checkout(&context, &file, yes).await,
            Commands::Update { path } => execute_update(&context, path).await,
            Commands::Annotate { file } => execute_annotate(&context, &file).await,
            Commands::Diff { file } => execute_diff(&context, &file).await,
            Commands::Get { file, version } => execute_get(&context, &file, &version).await,
            Commands::Serve => execute_serve(&context).await,
        }
    });
    // The stdin reader of `serve` may still be blocked on a read
    runtime.shutdown_background();
    result
}

fn main() {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref());
    init_logging(cli.debug, settings.as_ref().ok());

    if let Err(e) = settings.and_then(|settings| run(cli, settings)) {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
