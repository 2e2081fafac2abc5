//! Structured logging for rq-core.
//!
//! stdout carries command output only. Logs go to stderr, either human
//! readable or as JSON lines.

pub mod config;
pub mod events;

pub use config::{LogConfig, LogFormat, LogLevel};
pub use events::{event_names, LogContext, Stage};

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crates whose events pass the default filter.
const LOG_TARGETS: &[&str] = &["rq_core", "rq_config", "rq_common"];

/// Build the filter: RUST_LOG when set, otherwise the configured level for
/// the workspace crates.
pub fn build_filter(config: &LogConfig) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    let level = LevelFilter::from(config.level);
    let directives = LOG_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::new(directives)
}

/// Install the global subscriber. A second call is a no-op.
pub fn init_logging(config: &LogConfig) {
    let filter = build_filter(config);

    let result = match config.format {
        LogFormat::Human => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
            } else {
                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer.without_time())
                    .try_init()
            }
        }
        LogFormat::Jsonl => {
            let layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry()
                .with(filter)
                .with(layer)
                .try_init()
        }
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}

/// Unique id for one invocation.
pub fn generate_run_id() -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &uuid[..12])
}

/// Emit a tracing event stamped with the context's ids and a stage.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::STATE_PERSISTED, Stage::Persist, "derived state written",
///     tef = report.tef);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, INFO, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::info!(
            event = $event,
            run_id = %$ctx.run_id,
            session_id = ?$ctx.session_id,
            stage = %$stage,
            $($($field)+ ,)?
            "{}", $msg
        )
    };
    ($ctx:expr, DEBUG, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::debug!(
            event = $event,
            run_id = %$ctx.run_id,
            session_id = ?$ctx.session_id,
            stage = %$stage,
            $($($field)+ ,)?
            "{}", $msg
        )
    };
    ($ctx:expr, WARN, $event:expr, $stage:expr, $msg:expr $(, $($field:tt)+)?) => {
        tracing::warn!(
            event = $event,
            run_id = %$ctx.run_id,
            session_id = ?$ctx.session_id,
            stage = %$stage,
            $($($field)+ ,)?
            "{}", $msg
        )
    };
}
