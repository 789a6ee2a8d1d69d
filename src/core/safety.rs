//! Input limits enforced before a document is loaded.
//!
//! Rejects uploads that are too large, and source paths that look like
//! secrets (so a stray `.env` is never shipped to a remote backend).

use std::path::Path;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Limits applied to uploaded contracts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLimits {
    /// Maximum upload size in bytes (default: 20MB)
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: u64,

    /// Maximum extracted text size in bytes (default: 2MB)
    #[serde(default = "default_max_text_bytes")]
    pub max_text_bytes: u64,

    /// Glob patterns to reject (files matching these won't be processed)
    #[serde(default = "default_denylist")]
    pub denylist_patterns: Vec<String>,
}

fn default_max_input_bytes() -> u64 {
    20 * 1024 * 1024
}
fn default_max_text_bytes() -> u64 {
    2 * 1024 * 1024
}

fn default_denylist() -> Vec<String> {
    vec![
        "**/.env*".to_string(),
        "**/secrets*".to_string(),
        "**/*credential*".to_string(),
        "**/*.pem".to_string(),
        "**/*.key".to_string(),
    ]
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            max_text_bytes: default_max_text_bytes(),
            denylist_patterns: default_denylist(),
        }
    }
}

impl InputLimits {
    /// Check if a source path matches any denylist pattern
    pub fn is_denylisted(&self, path: &str) -> bool {
        for pattern_str in &self.denylist_patterns {
            if let Ok(pattern) = Pattern::new(pattern_str) {
                if pattern.matches(path) {
                    return true;
                }
            }
        }
        false
    }

    /// Validate raw upload bytes against size limits and denylist
    pub fn validate_upload(&self, bytes: &[u8], source_path: Option<&Path>) -> Result<(), SafetyViolation> {
        let size = bytes.len() as u64;
        if size > self.max_input_bytes {
            return Err(SafetyViolation::MaxInputBytes {
                actual: size,
                limit: self.max_input_bytes,
            });
        }

        if let Some(path) = source_path {
            let path_str = path.to_string_lossy();
            if self.is_denylisted(&path_str) {
                return Err(SafetyViolation::DenylistMatch {
                    path: path_str.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Validate extracted text size
    pub fn validate_text(&self, text: &str) -> Result<(), SafetyViolation> {
        let size = text.len() as u64;
        if size > self.max_text_bytes {
            return Err(SafetyViolation::MaxTextBytes {
                actual: size,
                limit: self.max_text_bytes,
            });
        }
        Ok(())
    }
}

/// Safety violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SafetyViolation {
    #[error("Maximum input bytes exceeded: {actual} > {limit}")]
    MaxInputBytes { actual: u64, limit: u64 },

    #[error("Maximum extracted text bytes exceeded: {actual} > {limit}")]
    MaxTextBytes { actual: u64, limit: u64 },

    #[error("Path matches denylist pattern: {path}")]
    DenylistMatch { path: String },
}
