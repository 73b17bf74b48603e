//! Command-line argument parsing for the `uwo` binary.
//!
//! Uses clap derive. Each subcommand maps to one catalog operation; `classify`
//! runs the metadata classifier over a sensor's comments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use uwo_tools::config::{Config, DatabaseConfig};
use uwo_tools::query::TimeRangeFilter;

/// Sensor used by `classify` when none is given.
pub const DEFAULT_CLASSIFY_SOURCE: &str = "bf_f12_47a_zurcherstr";

/// Query and classify the UWO sewer sensor dataset.
#[derive(Parser, Debug)]
#[command(name = "uwo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Write logs to the state directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    /// Database backend: 0 = sqlite, 1 = mariadb, 2 = postgres (overrides config)
    #[arg(long, value_name = "FLAG", env = "UWO_BACKEND", global = true)]
    pub backend: Option<i64>,

    /// SQLite database file (overrides config)
    #[arg(long, value_name = "PATH", global = true)]
    pub sqlite_path: Option<PathBuf>,

    /// Print at most this many rows
    #[arg(long, value_name = "ROWS", global = true)]
    pub head: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List all measured variables (prints the first 5 rows unless --head is given)
    Variables,

    /// List sites that recorded a variable
    Sites {
        /// Variable name, e.g. flow_rate
        variable: String,
    },

    /// List sensors of a site
    Sensors {
        /// Site name
        site: String,
    },

    /// Print the time series of a sensor
    Series {
        /// Sensor (source) name
        source: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Print the metadata comments of a sensor
    Metadata {
        /// Sensor (source) name
        source: String,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Print every flow rate signal
    FlowRate,

    /// Classify the metadata comments of a flow sensor
    Classify {
        /// Sensor (source) name
        #[arg(default_value = DEFAULT_CLASSIFY_SOURCE)]
        source: String,

        /// First timestamp_start to include
        #[arg(long, value_name = "DATE", default_value = "2020-08-01")]
        start: String,

        /// Last timestamp_start to include
        #[arg(long, value_name = "DATE", default_value = "2020-10-01")]
        end: String,
    },
}

/// Optional date range and row limit.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeArgs {
    /// Inclusive lower bound, e.g. 2020-01-01
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Inclusive upper bound, e.g. 2020-02-01
    #[arg(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Maximum number of rows
    #[arg(long, value_name = "ROWS")]
    pub limit: Option<i64>,
}

impl RangeArgs {
    /// Converts to a catalog filter.
    pub fn to_filter(&self) -> TimeRangeFilter {
        TimeRangeFilter {
            start_date: self.start.clone(),
            end_date: self.end.clone(),
            limit: self.limit,
        }
    }
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies command-line overrides to the database settings.
    pub fn apply_overrides(&self, database: &mut DatabaseConfig) {
        if let Some(backend) = self.backend {
            database.backend = backend;
        }
        if let Some(path) = &self.sqlite_path {
            database.sqlite_path = path.clone();
        }
    }
}

/// Formats an elapsed time as `MM:SS+mmm`.
pub fn format_wall_time(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}+{:03}",
        total_secs / 60,
        total_secs % 60,
        elapsed.subsec_millis()
    )
}
