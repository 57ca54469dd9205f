mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::waterfall::{ExitRangeArgs, WaterfallArgs};

/// Liquidation waterfall calculations for cap tables
#[derive(Parser)]
#[command(
    name = "lwf",
    version,
    about = "Liquidation waterfall calculations for cap tables",
    long_about = "A CLI for distributing exit proceeds across a cap table with decimal \
                  precision. Pays liquidation preferences by seniority, then splits the \
                  remainder across common and participating preferred, honoring caps."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log pipeline stages to stderr (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Distribute a single exit amount across the cap table
    Waterfall(WaterfallArgs),
    /// Run the waterfall across a range of exit amounts
    ExitRange(ExitRangeArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Waterfall(args) => commands::waterfall::run_waterfall(args),
        Commands::ExitRange(args) => commands::waterfall::run_exit_range(args),
        Commands::Version => {
            println!("lwf {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
