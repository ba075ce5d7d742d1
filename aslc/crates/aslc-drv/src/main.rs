use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// ASL pseudocode front-end for vendor architecture XML.
#[derive(Parser)]
#[command(name = "aslc", version)]
struct Cli {
    /// Directory containing the architecture XML files
    dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match aslc_drv::run(&cli.dir) {
        Ok(summary) if summary.errors == 0 => {
            tracing::info!(
                files = summary.files,
                fragments = summary.fragments,
                "all fragments parsed"
            );
            ExitCode::SUCCESS
        }
        Ok(summary) => {
            eprintln!("error: {} fragment(s) failed to parse", summary.errors);
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            ExitCode::FAILURE
        }
    }
}
