use clap::{Parser as ClapParser, Subcommand};
use jp_policy::{
    Config,
    cli::{self, CliError, QueryOptions},
};
use std::{
    io::{self, Read},
    path::PathBuf,
};
use tracing::debug;

#[derive(ClapParser)]
#[command(name = "jp")]
#[command(about = "jp - JSON queries with quantity and duration arithmetic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Interpreter configuration (JSON file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression against a JSON document
    Query {
        /// The expression to evaluate
        expression: String,

        /// JSON input (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Check the syntax of an expression
    Check {
        /// The expression to check
        expression: String,
    },

    /// List available functions and their signatures
    Functions {
        /// Only show functions whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    cli::setup_logging(cli.verbose, cli.quiet);

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Commands::Query {
            expression,
            input,
            pretty,
        } => run_query(expression, input, pretty, config),
        Commands::Check { expression } => {
            cli::execute_check(&expression, &config).map(|_| println!("Syntax is valid"))
        }
        Commands::Functions { filter } => {
            for signature in cli::list_functions(&config, filter.as_deref()) {
                println!("{}", signature);
            }
            Ok(())
        }
    });

    if let Err(e) = result {
        debug!(?e, "command failed");
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, CliError> {
    match path {
        Some(path) => cli::load_config(path),
        None => Ok(Config::default()),
    }
}

fn run_query(
    expression: String,
    input: Option<String>,
    pretty: bool,
    config: Config,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = QueryOptions {
        expression,
        input,
        config,
    };
    let output = cli::execute_query(&options)?;
    let json = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }?;
    println!("{}", json);
    Ok(())
}
