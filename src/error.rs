//! Error types shared by the thread engine, comment files and identifier generation.

use std::io;
use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A non-retrying identifier request hit a known identifier.
    #[error("identifier '{0}' already exists")]
    UidExists(String),

    #[error("could not generate a unique identifier after {0} attempts")]
    UidTooManyRetries(usize),

    /// Reserved: unresolved parents are currently represented by placeholders.
    #[error("parent '{0}' not found")]
    ParentNotFound(String),

    #[error("comment '{0}' cannot be placed under its own reply")]
    ParentCycle(String),

    #[error("invalid identifier '{0}' (allowed: letters, digits, '-' and '_')")]
    InvalidUid(String),

    #[error("{}:{line}: malformed thread entry: {reason}", path.display())]
    MalformedThreadLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("{}: malformed metadata line '{line}'", path.display())]
    MalformedMetadataLine { path: PathBuf, line: String },

    #[error("{}: invalid date '{value}'", path.display())]
    InvalidDate { path: PathBuf, value: String },

    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("comment body is not valid UTF-8: {0}")]
    Encoding(#[from] FromUtf8Error),
}

impl Error {
    /// Wrap an I/O error with the path it concerns. `NotFound` becomes `MissingFile`.
    pub fn io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Error::MissingFile(path.to_path_buf())
        } else {
            Error::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn is_missing_file(&self) -> bool {
        matches!(self, Error::MissingFile(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_missing_file() {
        let err = Error::io(
            Path::new("/nope/post.thread"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.is_missing_file());
        assert_eq!(err.to_string(), "file not found: /nope/post.thread");
    }

    #[test]
    fn test_io_other_keeps_source() {
        let err = Error::io(
            Path::new("post.thread"),
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(!err.is_missing_file());
        assert_eq!(err.to_string(), "post.thread: denied");
    }

    #[test]
    fn test_malformed_thread_line_display() {
        let err = Error::MalformedThreadLine {
            path: PathBuf::from("a.thread"),
            line: 3,
            reason: "invalid level 'x'".to_string(),
        };
        assert_eq!(err.to_string(), "a.thread:3: malformed thread entry: invalid level 'x'");
    }
}
