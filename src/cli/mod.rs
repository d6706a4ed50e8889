//! CLI support for jp
//!
//! The subcommands are exposed as plain functions so other tools can embed
//! them without going through the binary.

mod check;
mod functions;
mod query;

pub use check::execute_check;
pub use functions::list_functions;
pub use query::{QueryOptions, execute_query};

use std::{fs, io, path::Path};

use thiserror::Error;

use crate::{Config, EvalError, ParseError};

/// Errors that can occur during CLI operations
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid config {path}: {source}")]
    Config {
        path: String,
        source: serde_json::Error,
    },

    #[error("No input provided. Use --input or pipe JSON to stdin.")]
    NoInput,
}

/// Read a [`Config`] from a JSON file.
pub fn load_config(path: &Path) -> Result<Config, CliError> {
    let text = fs::read_to_string(path)?;
    Config::from_json(&text).map_err(|source| CliError::Config {
        path: path.display().to_string(),
        source,
    })
}

/// Install the stderr log subscriber. `-q` keeps errors only, each `-v`
/// lowers the threshold one level from `warn`.
pub fn setup_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let formatter = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true);

    // a second call (tests embedding the CLI) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(formatter)
        .with(filter)
        .try_init();
}
