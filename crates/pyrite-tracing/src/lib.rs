//! Shared tracing configuration utilities for the pyrite workspace.
//!
//! The helpers in this crate centralise how tools, integration tests, and
//! benches install `tracing` subscribers. Routing setup through a single
//! crate keeps the logging surface consistent instead of copy-pasting
//! builder logic into every binary.

use std::env;

pub use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for the formatter layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingOutput {
    /// Human-oriented multi-line output for local development.
    Pretty,
    /// Single-line JSON for CI and log collection.
    Json,
}

/// Configuration describing how the shared tracing subscriber should behave.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Optional tracing directives (e.g. `pyrite_runtime=debug,info`).
    /// When absent the crate falls back to `RUST_LOG` and finally to
    /// `default_directive`.
    pub directives: Option<String>,
    /// Fallback directive used when neither `directives` nor `RUST_LOG`
    /// resolve to a valid filter.
    pub default_directive: String,
    /// Controls whether event targets (module paths) appear in output.
    pub include_targets: bool,
    /// Controls ANSI formatting. Disable for CI logs that strip colour codes.
    pub ansi: bool,
    /// Output format for the formatter layer.
    pub output: TracingOutput,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_local()
    }
}

impl TracingConfig {
    /// Returns a configuration tuned for local development (pretty, ANSI-enabled output).
    pub fn for_local() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: true,
            output: TracingOutput::Pretty,
        }
    }

    /// Returns a configuration tuned for CI or log collection environments (JSON, no ANSI).
    pub fn for_ci() -> Self {
        Self {
            directives: None,
            default_directive: "info".to_string(),
            include_targets: true,
            ansi: false,
            output: TracingOutput::Json,
        }
    }

    /// Resolve the effective filter: explicit directives, then `RUST_LOG`,
    /// then the default directive.
    fn env_filter(&self) -> EnvFilter {
        if let Some(directives) = &self.directives {
            if let Ok(filter) = EnvFilter::try_new(directives) {
                return filter;
            }
        }
        if let Ok(rust_log) = env::var(EnvFilter::DEFAULT_ENV) {
            if let Ok(filter) = EnvFilter::try_new(rust_log) {
                return filter;
            }
        }
        EnvFilter::new(&self.default_directive)
    }

    /// Install a global subscriber built from this configuration.
    ///
    /// Returns `Err` if a global subscriber is already installed.
    pub fn try_install(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let builder = fmt()
            .with_env_filter(self.env_filter())
            .with_target(self.include_targets)
            .with_ansi(self.ansi);

        match self.output {
            TracingOutput::Pretty => builder.pretty().try_init(),
            TracingOutput::Json => builder.json().try_init(),
        }
    }
}

/// Install a subscriber for integration tests.
///
/// Idempotent: tests in one binary race to install, every caller after the
/// first becomes a no-op. Honours `RUST_LOG`, defaults to `warn` so test
/// output stays quiet unless asked for.
pub fn init_for_tests() {
    let config = TracingConfig {
        directives: None,
        default_directive: "warn".to_string(),
        include_targets: true,
        ansi: false,
        output: TracingOutput::Pretty,
    };
    let _ = config.try_install();
}
