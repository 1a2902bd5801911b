//! Telemetry initialisation primitives and logging configuration.
//!
//! # Design
//! - Centralises logging setup (fmt or JSON) with a single entry point.
//! - `RUST_LOG` always wins over the configured level.
//! - Test suites share one idempotent installer that writes through the test harness.

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging target when `RUST_LOG` is not provided.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const TEST_LOG_LEVEL: &str = "debug";

const ENV_LOG_FORMAT: &str = "TESTBED_LOG_FORMAT";

static TEST_LOGGING: OnceCell<()> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the tracing subscriber cannot be installed (for example,
/// because another subscriber has already been set globally).
pub fn init_logging(config: &LoggingConfig<'_>) -> Result<()> {
    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .json()
                    .with_writer(config.sink.make_writer())
                    .with_target(false)
                    .with_thread_ids(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(build_env_filter(config.level))
            .with(
                fmt::layer()
                    .with_writer(config.sink.make_writer())
                    .with_target(config.sink == LogSink::TestHarness)
                    .with_thread_ids(false),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })
}

/// Install a test-writer subscriber once per process.
///
/// Output goes through libtest's capture, so it only shows for failing tests
/// or with `--nocapture`. Later calls, or a subscriber installed elsewhere,
/// are ignored.
pub fn init_test_logging() {
    TEST_LOGGING.get_or_init(|| {
        let _ = init_logging(&LoggingConfig::for_tests());
    });
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Where formatted events are written.
    pub sink: LogSink,
}

impl LoggingConfig<'_> {
    /// Pretty `debug` output routed through libtest's capture.
    #[must_use]
    pub const fn for_tests() -> Self {
        Self {
            level: TEST_LOG_LEVEL,
            format: LogFormat::Pretty,
            sink: LogSink::TestHarness,
        }
    }
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: log_format_from_env(),
            sink: LogSink::Stdout,
        }
    }
}

/// Destination for formatted log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    /// Process standard output.
    Stdout,
    /// libtest's per-test capture.
    TestHarness,
}

impl LogSink {
    fn make_writer(self) -> BoxMakeWriter {
        match self {
            Self::Stdout => BoxMakeWriter::new(std::io::stdout),
            Self::TestHarness => BoxMakeWriter::new(fmt::TestWriter::new()),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("json") => Self::Json,
            Some("pretty") => Self::Pretty,
            _ => Self::infer(),
        }
    }
}

/// Read the log format from `TESTBED_LOG_FORMAT`, inferring it when unset or unknown.
#[must_use]
pub fn log_format_from_env() -> LogFormat {
    LogFormat::parse(std::env::var(ENV_LOG_FORMAT).ok().as_deref())
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
