use crate::app;
use clap::Parser;
use slog_gke::Level;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[allow(non_camel_case_types)]
pub enum LogLevelType {
    error,
    warn,
    info,
    debug,
    trace,
}

/// Reads lines from stdin and logs each of them. On GKE the lines go to Google Cloud
/// Logging, tagged with the cluster, namespace and component; elsewhere to the terminal.
#[derive(Parser, Debug)]
#[clap(
    name = app::NAME,
    version = app::VERSION,
    long_version = app::long_version(),
    author = "The bol.com gkelog team"
)]
pub(crate) struct Args {
    /// Sets the minimum level of the messages that are logged
    #[clap(
        long,
        value_name = "LEVEL",
        env = "GKELOG_LOG_LEVEL",
        default_value = "info",
        possible_values = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: LogLevelType,

    /// Sets the level every line read from stdin is logged at
    #[clap(
        long,
        value_name = "LEVEL",
        env = "GKELOG_LINE_LEVEL",
        default_value = "info",
        possible_values = ["fatal", "error", "warn", "info", "debug", "trace"]
    )]
    pub line_level: Level,
}
