//! Template libraries.
//!
//! - `clauses`: versioned safe-clause entries used for redrafts
//! - `agreements`: full Service / NDA / Employment agreements

pub mod agreements;
pub mod clauses;

pub use agreements::{compatible_template, AgreementTemplate};
pub use clauses::TemplateLibrary;
