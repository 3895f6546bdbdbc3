/// Crate-level error types for mdlinks diagnostics.
use std::path::PathBuf;

use crate::types::BrokenLink;

/// Fatal variants abort the scan; `BrokenLinks` is the aggregate lint outcome.
/// Each variant names the file or pattern that caused it.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// At least one link in the scanned tree is broken.
    #[error("broken links found")]
    BrokenLinks {
        /// Every violation, in walk order then document order.
        links: Vec<BrokenLink>,
    },

    /// A config file exists but cannot be read.
    #[error("config read failed: {}: {source}", path.display())]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// The file name pattern is not a valid glob.
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// Pattern as given by the user.
        pattern: String,
        /// The wrapped glob error.
        source: globset::Error,
    },

    /// A markdown file is not valid UTF-8.
    #[error("{} is not a valid utf8 file", path.display())]
    InvalidUtf8 {
        /// File that failed validation, relative to the scan root.
        path: PathBuf,
    },

    /// A markdown file could not be read.
    #[error("read failed: {}: {source}", path.display())]
    Io {
        /// File that could not be read, relative to the scan root.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// Report serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// Directory traversal failed.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped traversal error.
        #[from]
        walkdir::Error,
    ),
}
