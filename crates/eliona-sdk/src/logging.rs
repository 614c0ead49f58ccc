// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Eliona log line format for `tracing`.
//!
//! Every event is written as one line:
//!
//! ```text
//! INFO\t2025-01-31 12:00:00.000000\tweather\tFetched 3 stations\n
//! ```
//!
//! The level name is followed by the local timestamp (microseconds), the event
//! target and the message. Structured fields are appended as `key=value`.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::Local;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::error::{Result, SdkError};

/// Verbosity configured through `LOG_LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Level from `LOG_LEVEL`: `info` when unset, `debug` when unrecognized.
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL") {
            Ok(value) => value.parse().unwrap_or(LogLevel::Debug),
            Err(_) => LogLevel::Info,
        }
    }

    /// Name printed at the start of a line.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Most verbose `tracing` level that passes.
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Fatal | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fatal" => Ok(LogLevel::Fatal),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Maximum bytes per line including the newline. Longer lines are cut.
    pub buf_limit: Option<usize>,
}

impl LogConfig {
    /// Configuration from `LOG_LEVEL`, without line limit.
    pub fn from_env() -> Self {
        Self {
            level: LogLevel::from_env(),
            buf_limit: None,
        }
    }

    pub fn with_buf_limit(mut self, limit: usize) -> Self {
        self.buf_limit = Some(limit);
        self
    }
}

/// Event formatter producing Eliona log lines.
#[derive(Debug, Clone, Default)]
pub struct ElionaFormat {
    buf_limit: Option<usize>,
}

impl ElionaFormat {
    pub fn new(buf_limit: Option<usize>) -> Self {
        Self { buf_limit }
    }
}

impl<S, N> FormatEvent<S, N> for ElionaFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let line = format_line(
            LogLevel::from(metadata.level()),
            &Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
            metadata.target(),
            &visitor.finish(),
            self.buf_limit,
        );
        writer.write_str(&line)
    }
}

/// Assemble one log line and apply the length limit.
pub fn format_line(
    level: LogLevel,
    timestamp: &str,
    prefix: &str,
    message: &str,
    buf_limit: Option<usize>,
) -> String {
    let mut line = format!("{}\t{}\t{}\t{}", level.name(), timestamp, prefix, message);
    if !line.ends_with('\n') {
        line.push('\n');
    }
    if let Some(limit) = buf_limit.filter(|limit| *limit > 0) {
        if line.len() >= limit {
            let mut cut = limit - 1;
            while !line.is_char_boundary(cut) {
                cut -= 1;
            }
            line.truncate(cut);
            line.push('\n');
        }
    }
    line
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Install the Eliona formatter as global subscriber, configured from the
/// environment.
pub fn init() -> Result<()> {
    init_with(LogConfig::from_env())
}

/// Install the Eliona formatter as global subscriber.
///
/// `RUST_LOG`, when set, overrides the configured level with its directives.
pub fn init_with(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(config.level.as_level_filter().into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(ElionaFormat::new(config.buf_limit))
        .try_init()
        .map_err(|e| SdkError::Config(format!("failed to install logger: {}", e)))
}
