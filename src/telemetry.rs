//! Tracing subscriber bootstrap for binaries and tests
//!
//! The engine reports every degraded-data condition through `tracing`
//! events rather than errors. Downstream binaries (and tests that want to
//! see the warnings) can use this bootstrap instead of wiring a
//! subscriber themselves.

use crate::{Error, Result};

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize a process-wide fmt subscriber at the given level.
///
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init(log_level: &str) -> Result<()> {
    let level = parse_log_level(log_level)?;

    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .try_init();

    Ok(())
}

fn parse_log_level(raw: &str) -> Result<Level> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        other => Err(Error::Config(format!(
            "invalid log level '{other}', expected one of [trace, debug, info, warn, error]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_log_level_accepts_known_levels() {
        assert_eq!(parse_log_level("debug").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" WARN ").unwrap(), Level::WARN);
    }

    #[test]
    fn parse_log_level_rejects_unknown_levels() {
        let err = parse_log_level("loud").unwrap_err();
        assert!(format!("{err}").contains("loud"));
    }
}
