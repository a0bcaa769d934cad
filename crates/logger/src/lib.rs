//! Leveled, thread-safe logger for Lis.
//!
//! A [`Logger`] owns two channels, console and file, each with its own
//! threshold. It is an explicit handle: construct it once at start-up and
//! clone it into whatever needs to log. Clones share the same channels.
//!
//! ```text
//!   tracing::info!(..) ──▶ LoggerLayer ──┐
//!                                        ├─▶ Logger::log ──▶ mutex ──▶ console
//!   logger.message(..).append(..).commit()┘                      └──▶ Lis-<pid>-<time>.log
//! ```
//!
//! Every line is prefixed with a local, millisecond precision timestamp. Both
//! channel writes for one message happen under a single mutex, so lines from
//! different threads never interleave.

mod layer;
mod level;
mod message;

use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;

pub use layer::{default_env_filter, init_tracing, LoggerLayer};
pub use level::{LogLevel, ParseLevelError};
pub use message::{log_file_name, LogMessage, MessageBuilder};

/// Shared handle to the process logger.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<Inner>,
}

struct Inner {
    console_level: AtomicU8,
    file_level: AtomicU8,
    channels: Mutex<Channels>,
}

struct Channels {
    console: Box<dyn Write + Send>,
    file: Option<LogFile>,
    log_dir: PathBuf,
}

struct LogFile {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl Logger {
    /// Console at `Info` on stdout, file channel disabled.
    pub fn new() -> Self {
        Self::with_console_writer(io::stdout())
    }

    /// Same defaults as [`Logger::new`] but the console channel writes to `writer`.
    pub fn with_console_writer<W>(writer: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                console_level: AtomicU8::new(LogLevel::Info.to_raw()),
                file_level: AtomicU8::new(LogLevel::None.to_raw()),
                channels: Mutex::new(Channels {
                    console: Box::new(writer),
                    file: None,
                    log_dir: PathBuf::from("."),
                }),
            }),
        }
    }

    pub fn console_level(&self) -> LogLevel {
        LogLevel::from_raw(self.inner.console_level.load(Ordering::Acquire))
    }

    pub fn file_level(&self) -> LogLevel {
        LogLevel::from_raw(self.inner.file_level.load(Ordering::Acquire))
    }

    /// Most verbose threshold over the enabled channels (`None` if both are off).
    pub fn most_verbose_level(&self) -> LogLevel {
        self.console_level().min(self.file_level())
    }

    /// Directory where the next log file is created. Does not move an open file.
    pub fn set_log_dir(&self, dir: impl Into<PathBuf>) {
        self.lock().log_dir = dir.into();
    }

    /// Path of the open log file, if the file channel is enabled.
    pub fn file_path(&self) -> Option<PathBuf> {
        self.lock().file.as_ref().map(|file| file.path.clone())
    }

    /// Sets the console threshold; `LogLevel::None` silences the console.
    pub fn enable_console(&self, level: LogLevel) {
        self.inner
            .console_level
            .store(level.to_raw(), Ordering::Release);
    }

    /// Opens `Lis-<pid>-<timestamp>.log` in the log directory.
    ///
    /// Calling this while a file is already open does nothing. Passing
    /// `LogLevel::None` closes the file. If the file cannot be opened the
    /// failure is reported once and logging continues on the console only.
    pub fn enable_file(&self, overwrite: bool, level: LogLevel) {
        let mut channels = self.lock();
        if level == LogLevel::None {
            channels.file = None;
            self.inner
                .file_level
                .store(LogLevel::None.to_raw(), Ordering::Release);
            return;
        }

        if channels.file.is_some() {
            return;
        }

        let name = log_file_name(std::process::id(), Local::now().naive_local());
        let path = channels.log_dir.join(name);
        match open_log_file(&path, overwrite) {
            Ok(file) => {
                channels.file = Some(LogFile {
                    path,
                    writer: LineWriter::new(file),
                });
                self.inner
                    .file_level
                    .store(level.to_raw(), Ordering::Release);
            }
            Err(err) => {
                drop(channels);
                self.message(LogLevel::Error)
                    .append(format_args!(
                        "failed to open log file \"{}\" for writing: {err}",
                        path.display()
                    ))
                    .commit();
            }
        }
    }

    /// True if a message at `level` would reach at least one channel.
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.console_level().accepts(level) || self.file_level().accepts(level)
    }

    pub fn debug(&self, text: impl Into<String>) {
        self.log(LogLevel::Debug, text);
    }

    pub fn info(&self, text: impl Into<String>) {
        self.log(LogLevel::Info, text);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.log(LogLevel::Error, text);
    }

    /// Starts composing a message; see [`MessageBuilder`].
    pub fn message(&self, level: LogLevel) -> MessageBuilder<'_> {
        MessageBuilder::new(self, level)
    }

    pub fn log(&self, level: LogLevel, text: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        self.dispatch(&LogMessage::now(level, text));
    }

    /// Writes an already stamped message to every channel that accepts it.
    pub fn dispatch(&self, message: &LogMessage) {
        let line = message.render();
        let console_level = self.console_level();
        let file_level = self.file_level();

        let mut channels = self.lock();
        if console_level.accepts(message.level) {
            let _ = writeln!(channels.console, "{line}");
            let _ = channels.console.flush();
        }
        if file_level.accepts(message.level) {
            if let Some(file) = channels.file.as_mut() {
                let _ = writeln!(file.writer, "{line}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Channels> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("console_level", &self.console_level())
            .field("file_level", &self.file_level())
            .field("file", &self.file_path())
            .finish()
    }
}

fn open_log_file(path: &Path, overwrite: bool) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    if overwrite {
        options.write(true).truncate(true);
    } else {
        options.append(true);
    }
    options.open(path)
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// Console sink that records everything written to it.
    #[derive(Clone, Default)]
    pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl SharedBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }

        pub fn lines(&self) -> Vec<String> {
            self.contents().lines().map(str::to_owned).collect()
        }
    }

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
