//! # Error Types
//!
//! Fatal problems are [`LbxError`] values and abort the whole document.
//! Non-fatal problems (degraded font metrics, clamped run lengths, skipped
//! elements) are [`Warning`]s that travel next to a successful result.

use std::fmt;

use thiserror::Error;

use crate::metrics::Confidence;

/// Main error type for lbx-compose operations
#[derive(Debug, Error)]
pub enum LbxError {
    /// Invalid authored document or option (layout cycle, bad enum value, ...)
    #[error("Configuration error at {node}: {reason}")]
    Configuration { node: String, reason: String },

    /// Malformed archive content, with the offending element path
    #[error("Schema violation at {path}: {reason}")]
    SchemaViolation { path: String, reason: String },

    /// Out-of-range text editing operation
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// Zip container error
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// XML text that does not parse at all
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// JSON options or document
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LbxError {
    pub(crate) fn config(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaViolation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LbxError>;

/// A non-fatal problem reported alongside a successful result.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Text metrics for a node came from a source below an exact font match.
    FontDegraded {
        node: String,
        family: String,
        confidence: Confidence,
    },
    /// Lenient parse adjusted a text leaf whose run lengths did not cover its content.
    RunLengthClamped {
        path: String,
        declared: usize,
        actual: usize,
    },
    /// An object element the codec does not model was dropped on parse.
    UnknownElement { path: String, name: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::FontDegraded {
                node,
                family,
                confidence,
            } => write!(f, "{node}: font '{family}' measured with {confidence} metrics"),
            Warning::RunLengthClamped {
                path,
                declared,
                actual,
            } => write!(
                f,
                "{path}: run lengths cover {declared} characters, text has {actual}"
            ),
            Warning::UnknownElement { path, name } => {
                write!(f, "{path}: skipped unsupported element <{name}>")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_message_names_node() {
        let err = LbxError::config("Group1a2b", "width must be explicit");
        assert_eq!(
            err.to_string(),
            "Configuration error at Group1a2b: width must be explicit"
        );
    }

    #[test]
    fn test_io_error_is_verbatim() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "label.lbx");
        let err: LbxError = io.into();
        assert_eq!(err.to_string(), "I/O error: label.lbx");
    }

    #[test]
    fn test_warning_display() {
        let w = Warning::FontDegraded {
            node: "Text01".into(),
            family: "Helsinki".into(),
            confidence: Confidence::Heuristic,
        };
        assert_eq!(
            w.to_string(),
            "Text01: font 'Helsinki' measured with heuristic metrics"
        );
    }
}
