use std::fmt::{self, Write as _};

use chrono::{Local, NaiveDateTime};

use crate::{LogLevel, Logger};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H%M%S";

/// A single message on its way to the channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub text: String,
    pub timestamp: NaiveDateTime,
}

impl LogMessage {
    pub fn new(level: LogLevel, text: impl Into<String>, timestamp: NaiveDateTime) -> Self {
        Self {
            level,
            text: text.into(),
            timestamp,
        }
    }

    /// Stamps the message with the current local time.
    pub fn now(level: LogLevel, text: impl Into<String>) -> Self {
        Self::new(level, text, Local::now().naive_local())
    }

    /// Formats the line written to every channel: `YYYY-MM-DD HH:MM:SS.mmm text`.
    pub fn render(&self) -> String {
        format!("{} {}", self.timestamp.format(TIMESTAMP_FORMAT), self.text)
    }
}

/// Name of the log file created by [`Logger::enable_file`].
pub fn log_file_name(pid: u32, timestamp: NaiveDateTime) -> String {
    format!("Lis-{pid}-{}.log", timestamp.format(FILE_TIMESTAMP_FORMAT))
}

/// Composes a message piece by piece. Nothing reaches the channels until
/// [`MessageBuilder::commit`] is called; dropping the builder discards it.
#[must_use = "messages are only delivered by commit()"]
pub struct MessageBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    text: String,
}

impl<'a> MessageBuilder<'a> {
    pub(crate) fn new(logger: &'a Logger, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            text: String::new(),
        }
    }

    pub fn append(mut self, value: impl fmt::Display) -> Self {
        let _ = write!(self.text, "{value}");
        self
    }

    /// Text composed so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn commit(self) {
        self.logger.log(self.level, self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2017, 12, 23)
            .unwrap()
            .and_hms_milli_opt(9, 5, 7, 42)
            .unwrap()
    }

    #[test]
    fn renders_millisecond_prefix() {
        let message = LogMessage::new(LogLevel::Info, "planet ready", fixed_time());
        assert_eq!(message.render(), "2017-12-23 09:05:07.042 planet ready");
    }

    #[test]
    fn file_name_embeds_pid_and_time() {
        assert_eq!(log_file_name(4242, fixed_time()), "Lis-4242-2017-12-23T090507.log");
    }
}
