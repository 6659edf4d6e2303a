/*!
 * Core Module
 * Fundamental scheduler types, limits and error handling
 */

pub mod amc;
pub mod dci;
pub mod errors;
pub mod inline_string;
pub mod limits;
pub mod types;

// Re-export for convenience
pub use amc::Amc;
pub use dci::{DlDci, HarqDescriptor, RlcPdu, UlDci};
pub use errors::*;
pub use inline_string::InlineString;
pub use types::*;
