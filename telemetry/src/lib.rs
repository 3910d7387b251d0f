//! Logging setup for the modem exporter.
//!
//! Start with [`TelemetryConfig::new()`], then call [`TelemetryConfig::init()`]
//! exactly once at the beginning of the program.

use std::io::{IsTerminal as _, Write as _};

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

/// Where log records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// The systemd journal, tagged with the given syslog identifier.
    Journald(String),
    Stderr,
}

/// The toplevel logging config. Start here.
#[derive(Debug)]
pub struct TelemetryConfig {
    syslog_identifier: Option<String>,
    global_filter: EnvFilter,
}

impl TelemetryConfig {
    /// Logs at `info` unless `RUST_LOG` says otherwise.
    #[expect(clippy::new_without_default, reason = "may add required args later")]
    #[must_use]
    pub fn new() -> Self {
        Self {
            syslog_identifier: None,
            global_filter: EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        }
    }

    /// Enables journald, and uses the provided syslog identifier.
    ///
    /// If the application runs in a tty, stderr is used instead.
    #[must_use]
    pub fn with_journald(self, syslog_identifier: &str) -> Self {
        Self {
            syslog_identifier: Some(syslog_identifier.to_owned()),
            ..self
        }
    }

    /// Picks the destination for a process whose stderr is (or is not) a
    /// terminal. Interactive runs always log to stderr.
    pub fn destination(&self, stderr_is_terminal: bool) -> Destination {
        match &self.syslog_identifier {
            Some(id) if !stderr_is_terminal => Destination::Journald(id.clone()),
            _ => Destination::Stderr,
        }
    }

    pub fn try_init(
        self,
    ) -> Result<TelemetryFlusher, tracing_subscriber::util::TryInitError> {
        let journald_layer = match self.destination(std::io::stderr().is_terminal())
        {
            Destination::Journald(syslog_identifier) => tracing_journald::layer()
                .inspect_err(|err| {
                    eprintln!(
                        "failed connecting to journald socket. \
                        will write to stderr: {err}"
                    );
                })
                .map(|layer| layer.with_syslog_identifier(syslog_identifier))
                .ok(),
            Destination::Stderr => None,
        };

        let stderr_layer = journald_layer
            .is_none()
            .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(journald_layer)
            .with(self.global_filter)
            .try_init()?;

        Ok(TelemetryFlusher { _priv: () })
    }

    /// Initializes logging.
    ///
    /// Panics if called more than once or when another tracing subscriber is
    /// already registered.
    pub fn init(self) -> TelemetryFlusher {
        self.try_init().expect("failed to initialize modem-telemetry")
    }
}

/// Flushes buffered output on shutdown.
#[must_use = "call .flush at the end of the program, otherwise logs may get lost"]
pub struct TelemetryFlusher {
    _priv: (),
}

impl TelemetryFlusher {
    /// Call this at the end of the program.
    pub fn flush(self) {
        std::io::stderr().flush().ok();
        std::io::stdout().flush().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interactive_runs_log_to_stderr() {
        let cfg = TelemetryConfig::new().with_journald("modem-exporter");

        assert_eq!(cfg.destination(true), Destination::Stderr);
    }

    #[test]
    fn services_log_to_journald() {
        let cfg = TelemetryConfig::new().with_journald("modem-exporter");

        assert_eq!(
            cfg.destination(false),
            Destination::Journald("modem-exporter".to_string())
        );
    }

    #[test]
    fn without_identifier_logs_go_to_stderr() {
        let cfg = TelemetryConfig::new();

        assert_eq!(cfg.destination(false), Destination::Stderr);
    }
}
