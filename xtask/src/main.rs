use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(author, version, about = "Project automation commands", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cargo nextest with default configuration
    Nextest {
        #[arg(long)]
        profile: Option<String>,
        #[arg(long)]
        release: bool,
    },
    /// Format check, clippy with warnings denied, then the test suite
    Ci,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Nextest { profile, release } => run_nextest(profile, release)?,
        Commands::Ci => run_ci()?,
    }
    Ok(())
}

fn run_nextest(profile: Option<String>, release: bool) -> Result<()> {
    let mut args = vec!["nextest".to_owned(), "run".to_owned(), "--workspace".to_owned()];
    if let Some(profile) = profile {
        args.push("--profile".into());
        args.push(profile);
    }
    if release {
        args.push("--release".into());
    }
    cargo(&args)
}

fn run_ci() -> Result<()> {
    cargo(&["fmt", "--all", "--check"])?;
    cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])?;
    cargo(&["test", "--workspace"])
}

fn cargo<S: AsRef<str>>(args: &[S]) -> Result<()> {
    let mut cmd = Command::new(std::env::var("CARGO").unwrap_or_else(|_| "cargo".into()));
    cmd.args(args.iter().map(AsRef::as_ref));
    let status = cmd.status()?;
    if !status.success() {
        let rendered: Vec<&str> = args.iter().map(AsRef::as_ref).collect();
        anyhow::bail!("cargo {} failed", rendered.join(" "));
    }
    Ok(())
}
