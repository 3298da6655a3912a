use strum::{Display, EnumString};

/// The levels an [`Entry`](crate::hook::Entry) can carry, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Panic,
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Every level, in order of decreasing severity.
pub const ALL_LEVELS: [Level; 7] = [
    Level::Panic,
    Level::Fatal,
    Level::Error,
    Level::Warn,
    Level::Info,
    Level::Debug,
    Level::Trace,
];

impl From<slog::Level> for Level {
    fn from(level: slog::Level) -> Self {
        match level {
            slog::Level::Critical => Level::Fatal,
            slog::Level::Error => Level::Error,
            slog::Level::Warning => Level::Warn,
            slog::Level::Info => Level::Info,
            slog::Level::Debug => Level::Debug,
            slog::Level::Trace => Level::Trace,
        }
    }
}

/// The [LogSeverity](https://cloud.google.com/logging/docs/reference/v2/rest/v2/LogEntry#logseverity)
/// of a Google Cloud Logging entry.
///
/// Its `Display` form is the string the Logging API expects in the `severity` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Default,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

/// Maps a host level onto the severity it is shipped with.
pub fn to_severity(level: Level) -> Severity {
    match level {
        Level::Panic | Level::Fatal => Severity::Critical,
        Level::Error => Severity::Error,
        Level::Warn => Severity::Warning,
        Level::Info => Severity::Info,
        Level::Debug => Severity::Debug,
        _ => Severity::Default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn maps_every_level() {
        let mapped: Vec<Severity> = ALL_LEVELS.iter().map(|l| to_severity(*l)).collect();
        assert_eq!(
            mapped,
            vec![
                Severity::Critical,
                Severity::Critical,
                Severity::Error,
                Severity::Warning,
                Severity::Info,
                Severity::Debug,
                Severity::Default,
            ]
        );
    }

    #[test]
    fn unlisted_level_maps_to_default() {
        assert_eq!(to_severity(Level::Trace), Severity::Default);
    }

    #[test]
    fn severity_renders_as_api_string() {
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
        assert_eq!(Severity::Warning.to_string(), "WARNING");
        assert_eq!(Severity::Default.to_string(), "DEFAULT");
    }

    #[test]
    fn slog_levels_convert() {
        assert_eq!(Level::from(slog::Level::Critical), Level::Fatal);
        assert_eq!(Level::from(slog::Level::Warning), Level::Warn);
        assert_eq!(Level::from(slog::Level::Trace), Level::Trace);
    }

    #[test]
    fn levels_parse_from_lowercase_names() {
        assert_eq!("warn".parse::<Level>().unwrap(), Level::Warn);
        assert!("verbose".parse::<Level>().is_err());
    }
}
