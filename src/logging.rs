use std::io::IsTerminal;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LOG_FILTER_ENV;

/// Default filter when `CLOG_LOG` is unset or unparsable.
const DEFAULT_FILTER: &str = "warn";

/// Installs the diagnostic subscriber for the command line tools.
///
/// Diagnostics always go to stderr; stdout carries only table rows or
/// decoded lines. Color codes are written only when stderr is a terminal,
/// so redirected diagnostics stay plain text. The returned guard flushes pending records when dropped
/// and must be kept alive until the process exits.
///
/// Calling this more than once leaves the first subscriber in place.
pub fn init_logging() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .try_init();

    guard
}
