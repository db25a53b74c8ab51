use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use remark::app::review::ReviewService;
use remark::app::session::{FolderStore, SavedState};
use remark::domain::errors::ReviewError;
use remark::domain::model::TargetLanguage;
use remark::infra::config::Config;
use remark::infra::logging::{self, LogTarget};
use remark::ui::app::UiApp;
use remark::ui::components::folder_prompt::resolve_folder_input;

#[derive(Parser)]
#[command(author, version, about = "Review a random markdown note with a Gemini summary and quiz", long_about = None)]
struct Cli {
    /// Extra config file layered over the user config
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive review screen (default)
    Tui,
    /// Review one random note and print the generated summary
    Review(NoteArgs),
    /// Print the prompt for a random note without calling Gemini
    Prompt(NoteArgs),
    /// Show or change the saved study folder
    Folder {
        /// New folder to remember
        path: Option<String>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
struct NoteArgs {
    /// Folder to search instead of the saved one
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Output language of the summary and quiz
    #[arg(short, long, value_enum)]
    language: Option<TargetLanguage>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let store = FolderStore::default_location()?;

    let command = cli.command.unwrap_or(Commands::Tui);
    let log_path = store.dir().join("remark.log");
    let log_target = match command {
        Commands::Tui => LogTarget::File(&log_path),
        _ => LogTarget::Stderr,
    };
    logging::init(cli.verbose, log_target)?;

    let config = Config::load(cli.config.as_deref())?;

    match command {
        Commands::Tui => UiApp::new(&config, store)?.run()?,
        Commands::Review(args) => return run_review(&config, &store, args),
        Commands::Prompt(args) => return run_prompt(&config, &store, args),
        Commands::Folder { path } => run_folder(&config, &store, path.as_deref())?,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "remark", &mut io::stdout());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Review errors already read as user-facing messages, so they are printed as-is.
fn report_review_error(err: ReviewError) -> ExitCode {
    tracing::debug!(error = ?err, "review command failed");
    eprintln!("{err}");
    ExitCode::FAILURE
}

/// Resolve the folder and language for a one-shot command.
fn note_target(
    config: &Config,
    store: &FolderStore,
    args: NoteArgs,
) -> (Option<PathBuf>, TargetLanguage) {
    let saved = store.load_or_default();
    let root = args.root.or(saved.selected_path);
    let language = args
        .language
        .or(saved.language)
        .unwrap_or(config.defaults.language);
    (root, language)
}

fn run_review(config: &Config, store: &FolderStore, args: NoteArgs) -> Result<ExitCode> {
    let (root, language) = note_target(config, store, args);
    let service = ReviewService::from_config(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match runtime.block_on(service.review(root.as_deref(), language)) {
        Ok(text) => {
            println!("{text}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report_review_error(err)),
    }
}

fn run_prompt(config: &Config, store: &FolderStore, args: NoteArgs) -> Result<ExitCode> {
    let (root, language) = note_target(config, store, args);
    let Some(root) = root else {
        return Ok(report_review_error(ReviewError::NoRootPathSelected));
    };
    let service = ReviewService::from_config(config)?;
    match service.prepare(&root, language) {
        Ok(prepared) => {
            tracing::info!(note = %prepared.note.source_path.display(), "rendered prompt");
            println!("{}", prepared.prompt);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report_review_error(err)),
    }
}

fn run_folder(config: &Config, store: &FolderStore, path: Option<&str>) -> Result<()> {
    let saved = store.load_or_default();
    let Some(raw) = path else {
        match &saved.selected_path {
            Some(path) => println!("{}", path.display()),
            None => println!("No folder selected."),
        }
        return Ok(());
    };

    let folder = resolve_folder_input(raw)?;
    let updated = SavedState {
        selected_path: Some(folder.clone()),
        language: saved.language.or(Some(config.defaults.language)),
    };
    store.save(&updated)?;
    report_saved(&folder, store.path());
    Ok(())
}

fn report_saved(folder: &Path, state_file: &Path) {
    tracing::info!(state = %state_file.display(), "saved folder");
    println!("Folder selected! Ready to review: {}", folder.display());
}
