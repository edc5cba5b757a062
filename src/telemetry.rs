//! Logging bootstrap for promframes tools.

use crate::{Error, Result};

use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

/// Install a global fmt subscriber at the given level.
///
/// Output goes to stderr so decoded frames on stdout stay clean.
pub fn init_logging(log_level: &str, json: bool) -> Result<()> {
    let level = parse_log_level(log_level)?;
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Config(format!("failed to initialize logging subscriber: {e}")))?;

    debug!(level = %level, json, "Logging initialized");
    Ok(())
}

pub fn parse_log_level(raw: &str) -> Result<Level> {
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
    fn test_parse_log_level() {
        assert_eq!(parse_log_level("DEBUG").unwrap(), Level::DEBUG);
        assert_eq!(parse_log_level(" warn ").unwrap(), Level::WARN);
        assert!(parse_log_level("loud").is_err());
    }
}
