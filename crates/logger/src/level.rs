use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Severity of a log message, also used as a channel threshold.
///
/// Ordering is `Debug < Info < Error < None`. A channel configured with
/// `None` is disabled; a message is never logged at `None`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[serde(alias = "trace")]
    Debug,
    #[default]
    Info,
    #[serde(alias = "warn")]
    Error,
    #[serde(alias = "off")]
    None,
}

impl LogLevel {
    /// Returns true when a channel with threshold `self` accepts `message`.
    pub fn accepts(self, message: LogLevel) -> bool {
        self != LogLevel::None && message != LogLevel::None && message >= self
    }

    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
            LogLevel::None => "off",
        }
    }

    pub(crate) fn from_tracing(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            _ => LogLevel::Error,
        }
    }

    pub(crate) fn to_raw(self) -> u8 {
        self as u8
    }

    pub(crate) fn from_raw(raw: u8) -> Self {
        match raw {
            0 => LogLevel::Debug,
            1 => LogLevel::Info,
            2 => LogLevel::Error,
            _ => LogLevel::None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Error => "error",
            LogLevel::None => "none",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid log level '{0}'; expected debug, info, error or none")]
pub struct ParseLevelError(pub String);

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "error" | "warn" => Ok(LogLevel::Error),
            "none" | "off" => Ok(LogLevel::None),
            other => Err(ParseLevelError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::None);
    }

    #[test]
    fn none_threshold_rejects_everything() {
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Error] {
            assert!(!LogLevel::None.accepts(level));
        }
        assert!(!LogLevel::Debug.accepts(LogLevel::None));
    }

    #[test]
    fn threshold_accepts_equal_or_higher() {
        assert!(LogLevel::Info.accepts(LogLevel::Info));
        assert!(LogLevel::Info.accepts(LogLevel::Error));
        assert!(!LogLevel::Info.accepts(LogLevel::Debug));
    }

    #[test]
    fn parses_names() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!(" off ".parse::<LogLevel>().unwrap(), LogLevel::None);
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn raw_round_trip_covers_every_level() {
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Error, LogLevel::None] {
            assert_eq!(LogLevel::from_raw(level.to_raw()), level);
        }
    }
}
