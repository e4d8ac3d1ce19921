//! `efa` command-line client.
//!
//! Runs one EFA operation per invocation and prints the result as JSON.

use std::process::ExitCode;

use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use efa_client::{
    CoordFormat, DepartureOptions, EfaClient, EfaConfig, EfaError, LineOptions, LocationFilter,
    SearchOptions,
};

/// Query an EFA transit open-data endpoint
#[derive(Parser)]
#[command(name = "efa")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// EFA endpoint, e.g. https://efa.vgn.de/vgnExt_oeffi/
    #[arg(long, env = "EFA_BASE_URL")]
    base_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "EFA_TIMEOUT_SECS", default_value_t = 30)]
    timeout: u64,

    /// Verbosity level (overridden by RUST_LOG)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show instance metadata
    Info,

    /// Search locations by name or id
    Stops {
        name: String,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Search locations around a WGS84 coordinate
    Near {
        #[arg(allow_negative_numbers = true)]
        x: f64,

        #[arg(allow_negative_numbers = true)]
        y: f64,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Find lines by name
    Lines {
        name: String,

        #[command(flatten)]
        lines: LineArgs,
    },

    /// Lines serving a stop
    Serving {
        /// Stop id
        stop: String,

        #[command(flatten)]
        lines: LineArgs,
    },

    /// Stops of a line in route order
    LineStops {
        /// Line id
        line: String,
    },

    /// List all lines of the network
    Network {
        /// Restrict to one subnetwork
        subnetwork: Option<String>,

        #[command(flatten)]
        lines: LineArgs,
    },

    /// Upcoming departures at a stop
    Departures {
        /// Stop id
        stop: String,

        /// Maximum number of departures
        #[arg(short, long)]
        limit: Option<usize>,

        /// Local start time, e.g. 2024-11-10T22:16 (default: now)
        #[arg(long, value_parser = parse_time)]
        at: Option<NaiveDateTime>,

        /// Timetable only, no realtime estimates
        #[arg(long)]
        no_realtime: bool,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Restrict to a location category (repeatable)
    #[arg(short, long, value_enum)]
    filter: Vec<FilterArg>,

    /// Also return stops near matching addresses and POIs
    #[arg(long)]
    nearby_stops: bool,
}

impl SearchArgs {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            filters: self.filter.iter().copied().map(LocationFilter::from).collect(),
            limit: self.limit,
            search_nearby_stops: self.nearby_stops,
        }
    }
}

#[derive(Args)]
struct LineArgs {
    /// Report both directions of a line as one entry
    #[arg(long)]
    merge_dirs: bool,

    /// List trains individually instead of grouping them
    #[arg(long)]
    trains_explicit: bool,
}

impl LineArgs {
    fn options(&self) -> LineOptions {
        LineOptions::default()
            .with_merged_directions(self.merge_dirs)
            .with_trains_explicit(self.trains_explicit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FilterArg {
    Locations,
    Stops,
    Streets,
    Addresses,
    Crossings,
    Pois,
    PostCodes,
}

impl From<FilterArg> for LocationFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Locations => LocationFilter::Locations,
            FilterArg::Stops => LocationFilter::Stops,
            FilterArg::Streets => LocationFilter::Streets,
            FilterArg::Addresses => LocationFilter::Addresses,
            FilterArg::Crossings => LocationFilter::Crossings,
            FilterArg::Pois => LocationFilter::Pois,
            FilterArg::PostCodes => LocationFilter::PostCodes,
        }
    }
}

fn parse_time(value: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| format!("expected YYYY-MM-DDTHH:MM, got {value:?}"))
}

/// Determine log filter level from verbosity count
const fn log_filter_from_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(log_filter_from_verbosity(cli.verbose))),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = EfaConfig::new(cli.base_url).with_timeout(cli.timeout);
    let client = match EfaClient::connect(config).await {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to open EFA session: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&client, cli.command).await;
    client.close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(client: &EfaClient, command: Commands) -> Result<(), EfaError> {
    match command {
        Commands::Info => print(&client.info().await?),
        Commands::Stops { name, search } => {
            print(&client.locations_by_name(&name, &search.options()).await?)
        }
        Commands::Near { x, y, search } => print(
            &client
                .locations_by_coord(x, y, CoordFormat::Wgs84, &search.options())
                .await?,
        ),
        Commands::Lines { name, lines } => {
            print(&client.lines_by_name(&name, &lines.options()).await?)
        }
        Commands::Serving { stop, lines } => {
            print(&client.lines_by_location(&stop, &lines.options()).await?)
        }
        Commands::LineStops { line } => print(&client.locations_by_line(&line).await?),
        Commands::Network { subnetwork, lines } => print(
            &client
                .line_list(subnetwork.as_deref(), &lines.options())
                .await?,
        ),
        Commands::Departures {
            stop,
            limit,
            at,
            no_realtime,
        } => {
            let options = DepartureOptions {
                limit,
                at,
                realtime: !no_realtime,
            };
            print(&client.departures_by_location(&stop, &options).await?)
        }
    }
    Ok(())
}

fn print<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to render output: {e}"),
    }
}
