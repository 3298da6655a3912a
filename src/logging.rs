use crate::args::{Args, LogLevelType};

use slog::{o, Drain, Level, Logger, OwnedKVList, Record};
use slog_async::{Async, AsyncGuard};
use slog_gke::hook::{HookedDrain, Hooks};
use slog_term::{CompactFormat, TermDecorator};
use std::{fmt::Display, sync::Arc};

#[derive(Clone)]
struct FallbackToStderr<D: Drain> {
    drain: D,
}

impl<D: Drain> Drain for FallbackToStderr<D>
where
    D::Err: Display,
{
    type Ok = ();
    type Err = ();
    fn log(&self, record: &Record, logger_values: &OwnedKVList) -> Result<(), ()> {
        if let Err(err) = self.drain.log(record, logger_values) {
            eprint!("A drain could not log to its destination: {}", err);
        }
        Ok(())
    }

    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        self.drain.is_enabled(level)
    }
}

pub(crate) fn min_log_level(level: LogLevelType) -> Level {
    match level {
        LogLevelType::error => Level::Error,
        LogLevelType::warn => Level::Warning,
        LogLevelType::info => Level::Info,
        LogLevelType::debug => Level::Debug,
        LogLevelType::trace => Level::Trace,
    }
}

/// The root logger together with the hooks it fires. Drop the guard to flush the
/// asynchronous drain before exiting.
pub(crate) struct Logging {
    pub root: Logger,
    pub hooks: Arc<Hooks>,
    pub guard: AsyncGuard,
}

pub(crate) fn create_logger(args: &Args) -> Logging {
    let min_log_level = min_log_level(args.log_level);

    let decorator = TermDecorator::new().force_color().build();
    let term_drain = CompactFormat::new(decorator)
        .build()
        .map(|drain| FallbackToStderr { drain })
        .fuse();

    let hooks = Arc::new(Hooks::new());
    let hooked = HookedDrain::new(term_drain, hooks.clone())
        .filter_level(min_log_level)
        .ignore_res();
    let (drain, guard) = Async::new(hooked).build_with_guard();

    let root = Logger::root(drain.fuse(), o!());
    Logging { root, hooks, guard }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn log_levels_map_onto_slog() {
        assert_eq!(min_log_level(LogLevelType::error), Level::Error);
        assert_eq!(min_log_level(LogLevelType::warn), Level::Warning);
        assert_eq!(min_log_level(LogLevelType::trace), Level::Trace);
    }
}
