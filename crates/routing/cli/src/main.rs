//! routectl - command-line tooling for the document routing engine
//!
//! - `validate` compiles document-type files and reports their shape
//! - `simulate` replays a routing script against an in-memory engine

use clap::{Parser, Subcommand};
use routing_engine::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod definition;
mod output;
mod script;

use output::OutputFormat;

/// routectl CLI
#[derive(Parser)]
#[command(name = "routectl")]
#[command(about = "Validate document types and simulate document routing", long_about = None)]
#[command(version)]
struct Cli {
    /// Engine configuration file path
    #[arg(short, long, env = "ROUTING_CONFIG")]
    config: Option<String>,

    /// Log level (overrides the configuration file)
    #[arg(long, env = "ROUTING_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "ROUTING_LOG_JSON")]
    json: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Compile document-type files (TOML or JSON) and report problems
    Validate {
        /// Definition files
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Run a routing script against an in-memory engine
    #[command(alias = "sim")]
    Simulate {
        /// Script file (TOML or JSON)
        script: String,

        /// Document-type files to register before the script runs
        #[arg(short, long = "definition", required = true)]
        definitions: Vec<String>,

        /// Record failing steps and continue instead of stopping
        #[arg(long)]
        keep_going: bool,

        /// Print the final snapshot of every document
        #[arg(long)]
        snapshot: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref())?;

    // Initialize tracing
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into());

    if cli.json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    match cli.command {
        Commands::Validate { files } => commands::validate::execute(&files, cli.output),
        Commands::Simulate {
            script,
            definitions,
            keep_going,
            snapshot,
        } => commands::simulate::execute(
            config,
            &script,
            &definitions,
            commands::simulate::SimulateOptions {
                keep_going,
                snapshot,
                output: cli.output,
            },
        ),
    }
}
