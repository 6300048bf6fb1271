//! Error types for the filter core and the input source.
//!
//! Errors are stage-specific: the core reports bounds violations and
//! sink/source I/O failures; the input source reports path and
//! file-level failures before the core ever runs. All enums are
//! `#[non_exhaustive]`; consumers should include a fallback arm.
//!
//! Every variant renders as a single human-readable diagnostic line.
//! Bounds variants name the limit that was exceeded, I/O variants name
//! the offending operation.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Fatal errors from the filter core.
///
/// None of these are recoverable: processing stops, partial output
/// already written remains on the sink.
#[derive(Debug)]
#[non_exhaustive]
pub enum FilterError {
    /// An input line exceeded the per-line limit.
    LineTooLong { len: usize, max: usize },
    /// A block's aggregate raw text exceeded the per-block limit.
    BlockTooLarge { len: usize, max: usize },
    /// The streaming pending queue exceeded its capacity.
    PendingOverflow { count: usize, max: usize },
    /// Reading from the input stream failed.
    Read(io::Error),
    /// Writing to the sink failed.
    Write(io::Error),
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LineTooLong { len, max } => {
                write!(f, "line too long: {len} bytes (max {max})")
            }
            Self::BlockTooLarge { len, max } => {
                write!(f, "block too large: {len} bytes (max {max})")
            }
            Self::PendingOverflow { count, max } => {
                write!(f, "too many pending blocks: {count} (max {max})")
            }
            Self::Read(err) => write!(f, "read failed: {err}"),
            Self::Write(err) => write!(f, "write failed: {err}"),
        }
    }
}

impl std::error::Error for FilterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(err) | Self::Write(err) => Some(err),
            _ => None,
        }
    }
}

/// Errors from path sanitization and buffered file reads.
///
/// These occur before the core runs and typically indicate a hostile
/// or mistyped path, or an input outside the supported size envelope.
#[derive(Debug)]
#[non_exhaustive]
pub enum SourceError {
    /// The path is empty.
    EmptyPath,
    /// The path contains a NUL byte.
    NulInPath,
    /// The path contains a shell metacharacter.
    DangerousChar { ch: char },
    /// Absolute paths are rejected.
    AbsolutePath,
    /// Windows drive prefixes are rejected.
    DrivePrefix,
    /// The path contains a `..` traversal token.
    Traversal,
    /// The resolved path escapes the working directory.
    EscapesWorkdir,
    /// The file exceeds the buffered-read size limit.
    FileTooLarge { len: u64, max: u64 },
    /// The file exceeds the buffered-read line-count limit.
    TooManyLines { max: usize },
    /// Opening the file failed.
    Open { path: PathBuf, source: io::Error },
    /// Reading or mapping the file failed.
    Io(io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "invalid path: empty"),
            Self::NulInPath => write!(f, "invalid path: contains null byte"),
            Self::DangerousChar { ch } => {
                write!(f, "invalid path: contains dangerous character '{ch}'")
            }
            Self::AbsolutePath => write!(f, "absolute paths are not allowed"),
            Self::DrivePrefix => write!(f, "drive-prefixed paths are not allowed"),
            Self::Traversal => write!(f, "path traversal attempt detected"),
            Self::EscapesWorkdir => write!(f, "resolved path escapes working directory"),
            Self::FileTooLarge { len, max } => {
                write!(f, "file too large: {len} bytes (max {max})")
            }
            Self::TooManyLines { max } => write!(f, "too many lines (max {max})"),
            Self::Open { path, source } => {
                write!(f, "failed to open '{}': {source}", path.display())
            }
            Self::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}
