/*!
 * Structured Tracing
 * Subscriber setup and per-TTI spans using the tracing crate
 */

use crate::core::{Direction, SfnSf};
use tracing::{info, span, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - MAC_SCHED_TRACE_JSON: Enable JSON output (default: false)
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("MAC_SCHED_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    if use_json {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init();
        info!("Structured tracing initialized with JSON output");
    } else {
        let _ = registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init();
        info!("Structured tracing initialized");
    }
}

/// Identifier correlating every span of one scheduler instance
pub fn generate_run_id() -> Uuid {
    Uuid::new_v4()
}

/// Span covering one scheduling pass
///
/// `granted` and `deferred` are recorded once the pass completes.
pub fn tti_span(run_id: &Uuid, direction: Direction, sfn_sf: SfnSf) -> Span {
    span!(
        Level::DEBUG,
        "tti",
        run_id = %run_id,
        direction = %direction,
        sfn_sf = %sfn_sf,
        granted = tracing::field::Empty,
        deferred = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::debug;

    fn init_test_tracing() {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("debug"))
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init();
    }

    #[test]
    fn test_tti_span_records_fields() {
        init_test_tracing();
        let run_id = generate_run_id();
        let span = tti_span(&run_id, Direction::Downlink, SfnSf::new(3, 4));
        let _guard = span.enter();
        span.record("granted", 2);
        span.record("deferred", 0);
        debug!("inside tti span");
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
