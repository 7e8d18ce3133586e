//! Stored document models
//!
//! Uploaded documents live in a flat upload directory, one file per upload,
//! named `{user_id}_{sanitized_filename}`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::domain::errors::{ServiceError, ServiceResult};

const MAX_USER_ID_LEN: usize = 64;

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// A document persisted for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDocument {
    /// Owner of the document
    pub user_id: String,

    /// Name on disk: `{user_id}_{sanitized_filename}`
    pub stored_name: String,

    /// Full path inside the upload directory
    pub path: PathBuf,

    /// Size in bytes
    pub size_bytes: u64,

    /// Last modification time, used to pick the latest document
    pub modified_at: DateTime<Utc>,
}

impl StoredDocument {
    /// Deterministic on-disk name for a user's upload
    pub fn stored_name_for(user_id: &str, sanitized_filename: &str) -> String {
        format!("{user_id}_{sanitized_filename}")
    }

    /// Prefix shared by every document of `user_id`
    pub fn user_prefix(user_id: &str) -> String {
        format!("{user_id}_")
    }
}

/// Validate a tenant identifier before it is used in a file name.
///
/// Accepts 1-64 ASCII letters, digits and `-`. `_` is rejected because it
/// separates the user prefix from the file name.
pub fn validate_user_id(user_id: &str) -> ServiceResult<()> {
    let valid = !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-');

    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidUserId(user_id.to_string()))
    }
}

/// Reduce an uploaded file name to a safe, flat ASCII name.
///
/// Non-ASCII characters are dropped, path separators become spaces, runs of
/// whitespace become `_`, anything outside `[A-Za-z0-9_.-]` is removed and
/// leading/trailing `.`/`_` are stripped. Returns `None` when nothing is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        return None;
    }

    let stem = trimmed.split('.').next().unwrap_or_default().to_ascii_uppercase();
    if WINDOWS_DEVICE_NAMES.contains(&stem.as_str()) {
        return Some(format!("_{trimmed}"));
    }

    Some(trimmed.to_string())
}

/// Lowercase extension of a file name, if any
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// A sanitized name never contains a path component
        #[test]
        fn proptest_sanitized_name_is_flat(name in ".{0,64}") {
            if let Some(clean) = sanitize_filename(&name) {
                prop_assert!(!clean.contains('/'));
                prop_assert!(!clean.contains('\\'));
                prop_assert!(clean != "." && clean != "..");
                prop_assert!(!clean.starts_with('.'));
                prop_assert!(clean.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')));
            }
        }

        /// Sanitizing twice is the same as sanitizing once
        #[test]
        fn proptest_sanitize_idempotent(name in "[a-zA-Z0-9 ./\\\\_-]{1,40}") {
            if let Some(once) = sanitize_filename(&name) {
                prop_assert_eq!(sanitize_filename(&once), Some(once.clone()));
            }
        }
    }
}
