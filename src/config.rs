//! Decoder options
//!
//! The decoder has a single switch: dataplane mode, which changes the
//! frame type tags emitted for vector/matrix results but never the parsed
//! values.

use crate::{Error, Result};
use tracing::info;

/// Environment variable enabling dataplane frame tagging
pub const DATAPLANE_ENV: &str = "PROMFRAMES_DATAPLANE";

/// Options controlling emitted frame metadata
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Tag vector results as numeric-multi and stamp a type version on
    /// vector/matrix frames
    pub dataplane: bool,
}

impl DecoderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set dataplane mode
    pub fn with_dataplane(mut self, dataplane: bool) -> Self {
        self.dataplane = dataplane;
        self
    }

    /// Create options from environment
    ///
    /// Environment variables:
    /// - PROMFRAMES_DATAPLANE: "true"/"false" (default false)
    pub fn from_env() -> Result<Self> {
        let dataplane = parse_optional_bool(DATAPLANE_ENV)?.unwrap_or(false);
        if dataplane {
            info!("Dataplane frame tagging enabled");
        }
        Ok(Self { dataplane })
    }
}

fn parse_optional_bool(name: &str) -> Result<Option<bool>> {
    let Some(raw) = std::env::var(name).ok() else {
        return Ok(None);
    };
    parse_bool(name, &raw).map(Some)
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!(
            "{name} must be a boolean (true/false/1/0), got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_values() {
        assert!(parse_bool(DATAPLANE_ENV, "TRUE").unwrap());
        assert!(parse_bool(DATAPLANE_ENV, " on ").unwrap());
        assert!(!parse_bool(DATAPLANE_ENV, "0").unwrap());
        assert!(matches!(
            parse_bool(DATAPLANE_ENV, "maybe"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_env() {
        std::env::remove_var(DATAPLANE_ENV);
        assert!(!DecoderOptions::from_env().unwrap().dataplane);

        std::env::set_var(DATAPLANE_ENV, "yes");
        assert!(DecoderOptions::from_env().unwrap().dataplane);

        std::env::set_var(DATAPLANE_ENV, "sometimes");
        assert!(matches!(DecoderOptions::from_env(), Err(Error::Config(_))));

        std::env::remove_var(DATAPLANE_ENV);
    }

    #[test]
    fn test_builder() {
        assert!(!DecoderOptions::default().dataplane);
        assert!(DecoderOptions::new().with_dataplane(true).dataplane);
    }
}
