/*!
 * Monitoring
 * Tracing setup and TTI spans
 */

mod tracer;

pub use tracer::{generate_run_id, init_tracing, tti_span};
