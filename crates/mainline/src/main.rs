//! Mainline CLI - network analysis from the command line.
//!
//! Loads network data into the graph store, builds the graph, runs the
//! criticality batch and answers ad-hoc outage and spread queries.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

mod cli;

/// Mainline: connectivity and outage impact for distribution networks.
#[derive(Parser)]
#[command(name = "mainline")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Graph store location (`sqlite://path` or a path); overrides the
    /// environment and the configuration file
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write network data (pipes, services, buildings) into the graph store
    Load {
        /// JSON file with `pipes`, `services` and `buildings` arrays
        file: PathBuf,
    },

    /// Build the node/edge graph from the stored pipes
    Build,

    /// Score every edge by the buildings its failure disconnects
    Criticality {
        /// Process edges one at a time instead of in parallel
        #[arg(long)]
        sequential: bool,

        /// Length of the ranking report
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Show whether a graph is loaded
    Status,

    /// Show aggregate network statistics
    Stats,

    /// Show the impact of one edge failing
    Outage {
        /// Edge id
        edge_id: i64,
    },

    /// Show how an effect spreads from a point
    Spread {
        /// Longitude of the origin
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Latitude of the origin
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Hop limit (1-20)
        #[arg(long)]
        max_hops: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = match cli::Context::new(cli.config.as_deref(), cli.database.as_deref()) {
        Ok(ctx) => ctx,
        Err(e) => return report(&e),
    };

    // Run the appropriate command
    let result = match cli.command {
        Commands::Load { file } => cli::load::run(&ctx, &file),
        Commands::Build => cli::build::run(&ctx),
        Commands::Criticality { sequential, top } => cli::criticality::run(&ctx, sequential, top),
        Commands::Status => cli::status::run(&ctx),
        Commands::Stats => cli::stats::run(&ctx),
        Commands::Outage { edge_id } => cli::outage::run(&ctx, mainline::EdgeId(edge_id)),
        Commands::Spread { lon, lat, max_hops } => cli::spread::run(&ctx, lon, lat, max_hops),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(&e),
    }
}

fn report(e: &mainline::Error) -> ExitCode {
    eprintln!("{}: {e}", "error".red().bold());
    // Show cause chain for nested errors
    let mut source = std::error::Error::source(e);
    while let Some(cause) = source {
        eprintln!("  {}: {cause}", "caused by".dimmed());
        source = std::error::Error::source(cause);
    }
    match e {
        mainline::Error::Connection { .. } => eprintln!(
            "\n{}",
            "Make sure the graph store exists and MAINLINE_DATABASE_URL (or DATABASE_URL) is set correctly."
                .dimmed()
        ),
        mainline::Error::Cancelled { .. } => eprintln!(
            "\n{}",
            "Criticality run interrupted; the stored scores were left unchanged.".dimmed()
        ),
        _ => {}
    }
    ExitCode::FAILURE
}
