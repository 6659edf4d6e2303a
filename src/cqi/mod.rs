/*!
 * CQI Feedback
 * Channel-quality reports with age tracking and validity gating
 */

mod store;

pub use store::{CqiFeedbackStore, CqiSnapshot};
