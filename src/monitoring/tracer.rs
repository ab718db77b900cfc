/*!
 * Structured Tracing
 *
 * Environment variables:
 * - RUST_LOG: log level filter (default: info)
 * - RESOURCE_TRACE_JSON: JSON output when "1" or "true"
 *
 * `log` records emitted by the guards are forwarded through the
 * subscriber's `tracing-log` bridge.
 */

use std::time::Instant;
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Lifecycles slower than this are reported at warn
const SLOW_LIFECYCLE_MS: u128 = 100;

/// Install the global subscriber
///
/// Returns `false` if a subscriber was already installed (e.g. by a test
/// harness); the existing one is kept.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("RESOURCE_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
    };

    match installed {
        Ok(()) => {
            info!(json = use_json, "structured tracing initialized");
            true
        }
        Err(_) => false,
    }
}

/// Span covering one resource's life, from creation to destroy
///
/// Logs the elapsed time when dropped.
pub struct LifecycleSpan {
    span: Span,
    start: Instant,
    trace_id: Uuid,
    kind: &'static str,
}

impl LifecycleSpan {
    pub fn new(kind: &'static str) -> Self {
        let trace_id = Uuid::new_v4();
        let span = span!(
            Level::DEBUG,
            "lifecycle",
            trace_id = %trace_id,
            kind,
            outcome = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            trace_id,
            kind,
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn record_outcome(&self, success: bool) {
        self.span
            .record("outcome", if success { "success" } else { "error" });
    }
}

impl Drop for LifecycleSpan {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let _entered = self.span.enter();
        if elapsed.as_millis() > SLOW_LIFECYCLE_MS {
            warn!(
                trace_id = %self.trace_id,
                kind = self.kind,
                duration_ms = elapsed.as_millis(),
                "slow resource lifecycle"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                kind = self.kind,
                duration_us = elapsed.as_micros(),
                "resource lifecycle finished"
            );
        }
    }
}
