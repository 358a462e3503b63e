//! Error types for the EML and results page pipelines.
//!
//! `KiesraadError` is the library error for anything that stops a single
//! operation. Non-fatal problems found while walking a whole election
//! directory are reported as values instead: [`DiscoveryError`] for files
//! that are not count files and [`FileFailure`] for count files that could
//! not be parsed.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the kiesraad library.
#[derive(Debug, Error)]
pub enum KiesraadError {
    /// Invalid election identifier.
    #[error("Invalid election identifier: '{0}'. Expected e.g. TK2017 or GR2018_Amsterdam")]
    InvalidElectionId(String),

    /// Invalid date format.
    #[error("Invalid date format: '{0}'. Expected YYYY-MM-DD (e.g., 2017-03-15)")]
    InvalidDate(String),

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// Missing required XML element.
    #[error("Missing required XML element: {element} in {context}")]
    MissingElement { element: String, context: String },

    /// A vote count that is neither a number nor a not-applicable marker.
    #[error("Invalid vote count '{value}' in {context}")]
    InvalidCount { value: String, context: String },

    /// A saved results page without the expected structure.
    #[error("Invalid results page {}: {reason}", .path.display())]
    InvalidPage { path: PathBuf, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

impl KiesraadError {
    /// Shorthand for a [`KiesraadError::MissingElement`].
    pub fn missing(element: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingElement {
            element: element.into(),
            context: context.into(),
        }
    }
}

/// Result type alias for kiesraad operations.
pub type Result<T> = std::result::Result<T, KiesraadError>;

/// A file in the source directory that is not a municipality count file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryError {
    /// Path of the skipped file.
    pub path: PathBuf,
    /// Why the file was skipped.
    pub reason: String,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped {}: {}", self.path.display(), self.reason)
    }
}

/// A count file that was found but could not be read or parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    /// Municipality key the file was registered under.
    pub municipality: String,
    /// Path of the failing file.
    pub path: PathBuf,
    /// Rendered error.
    pub reason: String,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.municipality,
            self.path.display(),
            self.reason
        )
    }
}
