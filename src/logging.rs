use std::io;

use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when none is given or the given one does not parse.
pub const DEFAULT_FILTER: &str = "info";

/// Filter for `level`, or the default filter plus the parse error when `level` is invalid.
fn build_filter(level: &str) -> io::Result<(EnvFilter, Option<String>)> {
    match EnvFilter::try_new(level) {
        Ok(filter) => Ok((filter, None)),
        Err(e) => {
            let filter = EnvFilter::try_new(DEFAULT_FILTER)
                .map_err(|e| io::Error::other(format!("invalid log level: {e}")))?;
            Ok((filter, Some(e.to_string())))
        }
    }
}

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays machine-readable.
pub fn init_logging(level: &str) -> io::Result<()> {
    let (filter, rejected) = build_filter(level)?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(false),
        )
        .with(filter)
        .try_init()
        .map_err(io::Error::other)?;

    if let Some(reason) = rejected {
        warn!(level, fallback = DEFAULT_FILTER, "invalid log level: {reason}");
    }
    Ok(())
}
