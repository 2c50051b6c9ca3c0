//! backsync: confirm-before-apply one-way backup sync
//!
//! Compares a source tree with a backup tree, shows what would be copied
//! and deleted, asks once, then applies:
//! - New files and files whose modification time moved are copied
//! - Files gone from the source are deleted from the backup
//! - A `lastSync.txt` marker in the source records the last completed run

mod logging;
mod output;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::builder::styling::{AnsiColor, Effects};
use clap::{Args, Parser, Subcommand, builder::Styles};
use color_eyre::Result;
use tracing::info;

use backsync_core::config::CONFIG_FILE;
use backsync_core::event::Tee;
use backsync_core::{
    ConfigFile, DeletePolicy, RunOutcome, Scanner, SyncConfig, SyncPlan, Synchronizer,
    TracingObserver,
};

use crate::output::ConsoleObserver;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default())
    .valid(AnsiColor::Green.on_default())
    .invalid(AnsiColor::Red.on_default());

#[derive(Parser)]
#[command(name = "backsync")]
#[command(version)]
#[command(styles = STYLES)]
#[command(about = "One-way backup sync that asks before it touches anything")]
#[command(long_about = r#"
backsync mirrors a source directory into a backup directory.

It copies new files and files whose modification time differs by more than
the configured tolerance, deletes backup files that no longer exist in the
source, and asks for confirmation before changing anything.

Settings are read from backsync.toml in the working directory:
  input_dir      = "/home/me/documents"
  output_dir     = "/mnt/backup/documents"
  date_precision = 2

Examples:
  backsync                    Sync using backsync.toml
  backsync plan               Show what a sync would do
  backsync sync --yes         Sync without asking
  backsync scan ./documents   List a directory
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./backsync.toml, optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the plan, confirm and apply it (default)
    Sync(SyncArgs),

    /// Print the plan without applying it
    Plan {
        #[command(flatten)]
        overrides: ConfigArgs,
    },

    /// List one directory the way a sync sees it
    Scan {
        /// Directory to scan
        path: PathBuf,

        /// Output format (json, summary)
        #[arg(short, long, default_value = "summary")]
        format: String,

        /// Do not descend into symlinked directories
        #[arg(long)]
        no_follow_links: bool,
    },
}

#[derive(Args, Default)]
struct SyncArgs {
    #[command(flatten)]
    overrides: ConfigArgs,

    /// Apply without asking
    #[arg(short, long)]
    yes: bool,

    /// Directory for the log file (default: parent of the input directory)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Do not write a log file
    #[arg(long, conflicts_with = "log_dir")]
    no_log_file: bool,
}

/// Command-line overrides for config file values
#[derive(Args, Default)]
struct ConfigArgs {
    /// Source directory
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Backup directory; relative paths start at the filesystem root
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Seconds two modification times may differ and still match
    #[arg(short, long)]
    tolerance: Option<u64>,

    /// Show only the last N characters of long paths (0 disables)
    #[arg(long, allow_negative_numbers = true)]
    max_path_length: Option<i64>,

    /// What to do when a deletion fails (continue, abort)
    #[arg(long)]
    delete_policy: Option<DeletePolicy>,

    /// Do not descend into symlinked directories
    #[arg(long)]
    no_follow_links: bool,
}

impl ConfigArgs {
    fn into_overrides(self) -> ConfigFile {
        ConfigFile {
            input_dir: self.input,
            output_dir: self.output,
            date_precision: self.tolerance,
            max_path_length: self.max_path_length,
            delete_policy: self.delete_policy,
            follow_links: self.no_follow_links.then_some(false),
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Sync(SyncArgs::default()));

    match command {
        Commands::Scan {
            path,
            format,
            no_follow_links,
        } => {
            logging::init_console(cli.verbose);
            scan_command(&path, &format, !no_follow_links)?;
        }
        Commands::Plan { overrides } => {
            let config = load_config(cli.config.as_deref(), overrides)?;
            logging::init_console(cli.verbose);
            plan_command(config);
        }
        Commands::Sync(args) => {
            let config = load_config(cli.config.as_deref(), args.overrides)?;
            let log_dir = if args.no_log_file {
                None
            } else {
                args.log_dir
                    .or_else(|| logging::default_log_dir(&config.input_root))
            };
            let guard = logging::init(cli.verbose, log_dir.as_deref());
            sync_command(config, args.yes);
            if let Some(path) = &guard.log_path {
                eprintln!("Log written to {}", path.display());
            }
        }
    }

    Ok(())
}

/// Read the config file, apply command-line overrides and validate
fn load_config(path: Option<&Path>, overrides: ConfigArgs) -> Result<SyncConfig> {
    let file = match path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_or_default(Path::new(CONFIG_FILE))?,
    };
    let cwd = std::env::current_dir()?;
    file.merge(overrides.into_overrides()).resolve(&cwd)
}

fn scan_command(path: &Path, format: &str, follow_links: bool) -> Result<()> {
    info!("Scanning {}...", path.display());

    let listing = Scanner::new(path)
        .follow_links(follow_links)
        .list(&mut TracingObserver);

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&listing)?;
            println!("{json}");
        }
        _ => {
            eprintln!("Files: {}", listing.len());
            if listing.errors() > 0 {
                eprintln!("Unreadable entries: {}", listing.errors());
            }

            if listing.len() <= 20 {
                eprintln!("\nFiles:");
                for file in listing.files() {
                    eprintln!("  {}", file.display());
                }
            }
        }
    }

    Ok(())
}

fn plan_command(config: SyncConfig) {
    let spinner = output::scan_spinner();
    let mut observer = Tee(
        ConsoleObserver::new(&config.output_root, config.max_path_length, spinner.clone()),
        TracingObserver,
    );

    let sync = Synchronizer::new(config);
    let plan = sync.plan(&mut observer);
    output::finish_scan(&spinner);
    output::print_plan(&plan, &sync.config().output_root, sync.config().max_path_length);
}

fn sync_command(config: SyncConfig, assume_yes: bool) {
    info!(
        "Syncing {} -> {}",
        config.input_root.display(),
        config.output_root.display()
    );

    let started = Instant::now();
    let spinner = output::scan_spinner();
    let mut observer = Tee(
        ConsoleObserver::new(&config.output_root, config.max_path_length, spinner.clone()),
        TracingObserver,
    );

    let output_root = config.output_root.clone();
    let max_len = config.max_path_length;
    let mut confirm = |plan: &SyncPlan| {
        output::finish_scan(&spinner);
        output::print_plan(plan, &output_root, max_len);
        assume_yes || output::prompt_confirm()
    };

    let sync = Synchronizer::new(config);
    let outcome = sync.run(&mut confirm, &mut observer);
    output::finish_scan(&spinner);

    match outcome {
        RunOutcome::Rejected { .. } => {
            eprintln!("Process aborted by user");
            info!("Process aborted by user");
        }
        RunOutcome::Applied {
            plan,
            report,
            marker,
        } => {
            if plan.is_empty() {
                output::print_plan(&plan, &output_root, max_len);
            }
            output::print_summary(&report, started);
            if let Some(marker) = marker {
                output::print_status("Recorded", &marker.display().to_string());
            }
        }
    }
}
