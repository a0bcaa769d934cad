use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, Layer};

use crate::{LogLevel, Logger};

/// Forwards `tracing` events into a [`Logger`].
///
/// The event's `message` comes first, remaining fields follow as `key=value`.
pub struct LoggerLayer {
    logger: Logger,
}

impl LoggerLayer {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for LoggerLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = LogLevel::from_tracing(*event.metadata().level());
        if !self.logger.enabled(level) {
            return;
        }
        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);
        self.logger.log(level, visitor.finish());
    }
}

#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl EventVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields
        } else {
            format!("{} {}", self.message, self.fields)
        }
    }

    fn push_field(&mut self, name: &str, value: fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

/// Filter used when `RUST_LOG` is unset: everything the logger can show, with
/// GPU stack chatter capped at `warn`.
pub fn default_env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::new(format!(
        "{},wgpu_core=warn,wgpu_hal=warn,naga=warn",
        level.as_filter_directive()
    ))
}

/// Installs a global subscriber that routes every `tracing` event through `logger`.
pub fn init_tracing(logger: &Logger) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_env_filter(logger.most_verbose_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(LoggerLayer::new(logger.clone()))
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SharedBuffer;

    fn capture(logger: &Logger, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(LoggerLayer::new(logger.clone()));
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn forwards_message_and_fields() {
        let sink = SharedBuffer::default();
        let logger = Logger::with_console_writer(sink.clone());

        capture(&logger, || {
            tracing::info!(frames = 3, backend = "vulkan", "planet activated");
        });

        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(&lines[0][24..], "planet activated frames=3 backend=vulkan");
    }

    #[test]
    fn maps_tracing_levels_onto_thresholds() {
        let sink = SharedBuffer::default();
        let logger = Logger::with_console_writer(sink.clone());
        logger.enable_console(LogLevel::Error);

        capture(&logger, || {
            tracing::debug!("debug");
            tracing::info!("info");
            tracing::warn!("warn");
            tracing::error!("error");
        });

        let messages: Vec<String> = sink.lines().iter().map(|line| line[24..].to_string()).collect();
        assert_eq!(messages, vec!["warn".to_string(), "error".to_string()]);
    }

    #[test]
    fn default_filter_follows_logger_level() {
        let filter = default_env_filter(LogLevel::Debug).to_string();
        assert!(filter.contains("debug"));
        assert!(filter.contains("naga=warn"));
        assert!(default_env_filter(LogLevel::None).to_string().contains("off"));
    }
}
