use clap::Parser;
use envsync::map::EnvMap;
use envsync::sync::{EnvSync, EnvSyncError, EnvSyncOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
  name = "envsync",
  about = "Synchronize sample env and actual env file",
  version,
  author
)]
struct Cli {
  /// Path to the sample env file
  #[arg(short, long, default_value = "env.sample")]
  source: PathBuf,

  /// Path to the actual env file
  #[arg(short, long, default_value = ".env")]
  target: PathBuf,
}

fn setup_tracing() {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr))
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
    ))
    .init();
}

fn report(added: usize, source: &Path, target: &Path) -> String {
  if added > 0 {
    format!(
      "Added {added} new env variable\nRun \"tail -n {added} {}\" to view them",
      target.display()
    )
  } else {
    format!("{} already uptodate", source.display())
  }
}

/// Turns a sync result into the line printed on stdout; `Err` means a failing exit code.
fn outcome(
  result: Result<EnvMap, EnvSyncError>,
  source: &Path,
  target: &Path,
) -> Result<String, String> {
  result
    .map(|added| report(added.len(), source, target))
    .map_err(|err| err.to_string())
}

fn main() -> ExitCode {
  let cli = Cli::parse();

  setup_tracing();

  let options = EnvSyncOptions {
    source_file: cli.source.clone(),
    target_file: cli.target.clone(),
  };

  match outcome(
    EnvSync::sync_with_options(options),
    &cli.source,
    &cli.target,
  ) {
    Ok(message) => {
      println!("{message}");
      ExitCode::SUCCESS
    }
    Err(message) => {
      println!("{message}");
      ExitCode::FAILURE
    }
  }
}
