use std::io::Write;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Args, Command};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut out = std::io::stdout().lock();
    match args.command {
        Command::Ls { car } => {
            let entries = atpack_repo::open_repo_file(&car).await?;
            let count = commands::ls(entries, &mut out)?;
            tracing::debug!(count, "listed records");
        }
        Command::Dump { car } => {
            let entries = atpack_repo::open_repo_file(&car).await?;
            let count = commands::dump(entries, &mut out)?;
            tracing::debug!(count, "dumped records");
        }
        Command::Cid { file, codec, json } => {
            let contents = tokio::fs::read(&file)
                .await
                .into_diagnostic()
                .wrap_err_with(|| format!("reading {}", file.display()))?;
            let cid = commands::cid_of(&contents, codec, json)?;
            writeln!(out, "{}", cid).into_diagnostic()?;
        }
        Command::Inspect { cid } => commands::inspect(&cid, &mut out)?,
    }

    Ok(())
}
