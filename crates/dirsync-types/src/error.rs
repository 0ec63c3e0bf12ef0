//! Error types and handling for dirsync
//!
//! A sync run distinguishes two kinds of failure. Root failures (the walk over
//! the source or target root cannot start) abort the run and are returned to
//! the caller. Everything else is attached to the entry it happened on and the
//! run moves on.

use crate::types::EntryKind;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Main error type for dirsync operations
///
/// Messages are captured as strings so that errors can be cloned into
/// per-entry outcomes and handed to more than one event sink.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        /// Error message from the I/O operation
        message: String,
    },

    /// The source root could not be walked
    #[error("Cannot walk source root '{}': {message}", path.display())]
    SourceRoot {
        /// Source root path
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// The target root exists but could not be walked
    #[error("Cannot walk target root '{}': {message}", path.display())]
    TargetRoot {
        /// Target root path
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// Source and target disagree on what kind of entry lives at a path
    #[error("'{}' is a {source_kind} in source but a {target_kind} in target", path.display())]
    KindMismatch {
        /// Location of the entry under the target root
        path: PathBuf,
        /// Kind found under the source root
        source_kind: EntryKind,
        /// Kind found under the target root
        target_kind: EntryKind,
    },

    /// Entry is neither a regular file nor a directory
    #[error("Unsupported entry type: {}", path.display())]
    Unsupported {
        /// Path of the entry
        path: PathBuf,
    },

    /// File content was written but its timestamps could not be applied
    #[error("Failed to set times on '{}': {message}", path.display())]
    Timestamp {
        /// Path of the target file
        path: PathBuf,
        /// Underlying failure
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Generic error with custom message
    #[error("{message}")]
    Other {
        /// Custom error message
        message: String,
    },
}

/// Error kind for categorizing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O related errors
    Io,
    /// A root could not be walked
    Root,
    /// Source/target kind disagreement
    KindMismatch,
    /// Unsupported entry type
    Unsupported,
    /// Timestamp preservation failed
    Timestamp,
    /// Configuration errors
    Config,
    /// Other errors
    Other,
}

impl Error {
    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::SourceRoot { .. } | Self::TargetRoot { .. } => ErrorKind::Root,
            Self::KindMismatch { .. } => ErrorKind::KindMismatch,
            Self::Unsupported { .. } => ErrorKind::Unsupported,
            Self::Timestamp { .. } => ErrorKind::Timestamp,
            Self::Config { .. } => ErrorKind::Config,
            Self::Other { .. } => ErrorKind::Other,
        }
    }

    /// Whether this error aborts a sync run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceRoot { .. } | Self::TargetRoot { .. })
    }

    /// Create an I/O error that names the path it happened on
    pub fn io_at(path: &Path, error: impl Display) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), error),
        }
    }

    /// Create a source root error
    pub fn source_root(path: &Path, error: impl Display) -> Self {
        Self::SourceRoot {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    /// Create a target root error
    pub fn target_root(path: &Path, error: impl Display) -> Self {
        Self::TargetRoot {
            path: path.to_path_buf(),
            message: error.to_string(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new generic error
    pub fn other<S: Into<String>>(message: S) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    proptest! {
        #[test]
        fn test_only_root_errors_are_fatal(message in ".*") {
            let path = PathBuf::from("root");
            let per_entry = vec![
                Error::Io { message: message.clone() },
                Error::Timestamp { path: path.clone(), message: message.clone() },
                Error::Config { message: message.clone() },
                Error::Other { message: message.clone() },
                Error::Unsupported { path: path.clone() },
            ];
            for error in per_entry {
                prop_assert!(!error.is_fatal());
            }

            prop_assert!(Error::source_root(&path, &message).is_fatal());
            prop_assert!(Error::target_root(&path, &message).is_fatal());
        }
    }

    #[rstest]
    #[case(Error::io_at(Path::new("a"), "boom"), ErrorKind::Io)]
    #[case(Error::source_root(Path::new("a"), "gone"), ErrorKind::Root)]
    #[case(Error::target_root(Path::new("a"), "gone"), ErrorKind::Root)]
    #[case(Error::Unsupported { path: PathBuf::from("a") }, ErrorKind::Unsupported)]
    #[case(Error::config("bad"), ErrorKind::Config)]
    #[case(Error::other("misc"), ErrorKind::Other)]
    fn test_error_kind(#[case] error: Error, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }

    #[test]
    fn test_error_display() {
        let error = Error::KindMismatch {
            path: PathBuf::from("docs"),
            source_kind: EntryKind::Directory,
            target_kind: EntryKind::File,
        };
        assert_eq!(
            error.to_string(),
            "'docs' is a directory in source but a file in target"
        );

        let error = Error::io_at(Path::new("/t/a.txt"), "Permission denied");
        assert_eq!(error.to_string(), "I/O error: /t/a.txt: Permission denied");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: Error = io_error.into();
        assert_eq!(error.kind(), ErrorKind::Io);
        assert!(!error.is_fatal());
    }
}
