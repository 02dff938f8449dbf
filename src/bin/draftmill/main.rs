use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use spdlog::{error, info, warn};

use draftmill::config::Config;
use draftmill::draft_processor::{read_page_template, rebuild_index, BatchSummary, DraftProcessor, RunMode};
use draftmill::error::DraftState;
use draftmill::logger::configure_logger;
use draftmill::util::os_helper::get_name;
use draftmill::view::page_renderer::{PageRenderer, SiteInfo};

use crate::config::open_config;

mod config;
mod new_draft;

const CFG_FILE_NAME: &str = "draftmill.toml";

const EXIT_DRAFT_FAILED: u8 = 1;
const EXIT_BATCH_FAILED: u8 = 2;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Config path
    #[arg(short, long)]
    config_path: Option<String>,

    /// Log at debug level and always echo to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish every pending draft, or only the named one
    Process {
        /// Draft name, e.g. my-post or my-post.md
        draft: Option<String>,
    },
    /// Check drafts without moving or writing anything
    Validate {
        draft: Option<String>,
    },
    /// Rebuild the post index from the record files
    RebuildIndex,
    /// Create a new draft in the intake directory
    New {
        #[arg(short, long)]
        title: String,

        /// Name of the author. If empty, OS user real name is being used
        #[arg(short, long)]
        author: Option<String>,
    },
}

fn run_drafts(config: &Config, mode: RunMode, draft: Option<&str>) -> Result<BatchSummary> {
    let template = read_page_template(config)?;

    let mut processor = DraftProcessor::new(config, mode);
    if let Some(ref template) = template {
        let site = SiteInfo {
            site_url: config.publish.site_url.clone(),
            site_name: config.publish.site_name.clone(),
            pages_url_root: config.publish.pages_url_root.clone(),
        };
        processor = processor.with_pages(PageRenderer::new(template, site)?);
    }

    let summary = match draft {
        Some(name) => processor.process_named(name)?,
        None => processor.process_all()?,
    };
    Ok(summary)
}

fn print_summary(summary: &BatchSummary, mode: RunMode) {
    for outcome in &summary.outcomes {
        if outcome.state == DraftState::Processed {
            let verb = if mode == RunMode::ValidateOnly { "valid" } else { "processed" };
            println!("  ok      {} ({})", outcome.file_name, verb);
        }
    }
    for failure in &summary.failures {
        println!("  FAILED  {}", failure);
    }
    println!("{}", summary);
}

fn run(config: &Config, command: Command) -> Result<ExitCode> {
    match command {
        Command::Process { draft } => drafts_exit_code(config, RunMode::Publish, draft),
        Command::Validate { draft } => drafts_exit_code(config, RunMode::ValidateOnly, draft),
        Command::RebuildIndex => {
            let count = rebuild_index(config)?;
            println!("Index rebuilt with {} post(s): {}", count, config.paths.index_file.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::New { title, author } => {
            let author = get_name(author.as_deref());
            let today = Local::now().date_naive();
            let path = new_draft::create_draft(&config.paths.intake_dir, &title, &author, &today)
                .context("Could not create draft")?;
            println!("Created {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn drafts_exit_code(config: &Config, mode: RunMode, draft: Option<String>) -> Result<ExitCode> {
    let summary = run_drafts(config, mode, draft.as_deref())?;
    print_summary(&summary, mode);
    if summary.has_failures() {
        Ok(ExitCode::from(EXIT_DRAFT_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config_path = args.config_path.map(PathBuf::from);

    let config = match open_config(config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            eprintln!("Please run draftmill --help");
            return ExitCode::from(EXIT_BATCH_FAILED);
        }
    };

    if let Err(err) = configure_logger(&config, args.verbose) {
        warn!("Error creating logger sinks. Using console instead. Desc={}", err);
    }

    info!("Starting Draftmill =-=-=-=-=-=-=-=-=-=-=-=-=-=-=-");
    match run(&config, args.command) {
        Ok(code) => code,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(EXIT_BATCH_FAILED)
        }
    }
}
