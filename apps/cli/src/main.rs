//! Conductor CLI
//!
//! Runs the content, design, quality and delivery pipeline from the command line.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{capabilities, run};

/// Conductor - campaign workflow orchestration
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(about = "Run campaign workflows through the content, design, quality and delivery stages", long_about = None)]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a workflow with the built-in scripted specialists
    Run(run::RunArgs),

    /// Show the stages and features the coordinator manages
    Capabilities {
        /// Print the capabilities as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout stays machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run(run_args) => run::execute(run_args).await?,
        Command::Capabilities { json } => capabilities::execute(json)?,
    }

    Ok(())
}
