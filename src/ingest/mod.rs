//! Contract ingestion.
//!
//! - `loader`: DocumentLoader, normalization, fingerprinting
//! - `formats`: PDF / DOCX / TXT text extraction
//! - `language`: script-based language detection
//! - `entities`: parties, dates and amounts named in the text

pub mod entities;
pub mod formats;
pub mod language;
pub mod loader;

pub use entities::extract_entities;
pub use language::detect_language;
pub use loader::{detect_jurisdiction, fingerprint, normalize_whitespace, DocumentLoader};
