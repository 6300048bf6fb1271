//! Input collaborators: path sanitization, bounded line reading, and
//! whole-file materialization for buffered mode.
//!
//! The core treats its source as trusted; everything that makes the
//! source trustworthy lives here. Paths are sanitized before any open,
//! buffered reads go through a read-only mapping with hard size and
//! line-count limits, and the streaming reader enforces the per-line
//! bound while the line is still being read, so a pathological input
//! cannot buffer unbounded data.

use std::env;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use memchr::memchr;
use memmap2::Mmap;

use crate::errors::{FilterError, SourceError};
use crate::options::LARGE_FILE_THRESHOLD;
use crate::MAX_LINE_LEN;

/// Size limit for buffered (materialized) file reads.
pub const MAX_FILE_LEN: u64 = 1 << 40;
/// Line-count limit for buffered file reads.
pub const MAX_LINES: usize = 1_000_000;

/// Read-buffer size for the streaming reader.
const CHUNK_LEN: usize = 64 * 1024;

/// Shell metacharacters rejected in paths.
const DANGEROUS_CHARS: &[u8] = b"`$(){}[]|&;<>\"'\\";

/// Validates a user-supplied path without touching the filesystem.
///
/// Rejects empty paths, NUL bytes, shell metacharacters, absolute
/// paths, Windows drive prefixes, and `..` traversal tokens.
pub fn sanitize_path(input: &str) -> Result<PathBuf, SourceError> {
    if input.is_empty() {
        return Err(SourceError::EmptyPath);
    }
    let bytes = input.as_bytes();
    if bytes.contains(&0) {
        return Err(SourceError::NulInPath);
    }
    if let Some(&bad) = bytes.iter().find(|b| DANGEROUS_CHARS.contains(b)) {
        return Err(SourceError::DangerousChar { ch: bad as char });
    }
    if bytes[0] == b'/' {
        return Err(SourceError::AbsolutePath);
    }
    if bytes.len() > 2 && bytes[1] == b':' && (bytes[2] == b'/' || bytes[2] == b'\\') {
        return Err(SourceError::DrivePrefix);
    }
    if input.contains("..") {
        return Err(SourceError::Traversal);
    }
    Ok(PathBuf::from(input))
}

/// Sanitizes and resolves a path against the working directory.
///
/// Sanitization already rules out escapes in the textual form; for an
/// existing file the canonicalized result is additionally required to
/// stay under the canonicalized working directory (symlink escapes).
pub fn resolve_path(input: &str) -> Result<PathBuf, SourceError> {
    let rel = sanitize_path(input)?;
    let cwd = env::current_dir().map_err(SourceError::Io)?;
    let joined = cwd.join(rel);
    if !joined.exists() {
        // Let the open fail with a precise diagnostic.
        return Ok(joined);
    }
    let canon = fs::canonicalize(&joined).map_err(SourceError::Io)?;
    let cwd_canon = fs::canonicalize(&cwd).map_err(SourceError::Io)?;
    if !canon.starts_with(&cwd_canon) {
        return Err(SourceError::EscapesWorkdir);
    }
    Ok(canon)
}

/// Opens a resolved input file.
pub fn open_file(path: &Path) -> Result<File, SourceError> {
    File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns true when the file is big enough to prefer streaming mode.
///
/// Errors are swallowed: an unreadable file will fail at open time with
/// a better diagnostic than anything this probe could produce.
pub fn is_large_file(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.len() >= LARGE_FILE_THRESHOLD)
        .unwrap_or(false)
}

/// Materializes a whole file as LF-split, CR-stripped owned lines.
///
/// Used by buffered mode, where the epoch controller needs to scan for
/// the last marker before any line is processed.
pub fn read_file_lines(path: &Path) -> Result<Vec<Vec<u8>>, SourceError> {
    let file = open_file(path)?;
    let meta = file.metadata().map_err(SourceError::Io)?;
    if meta.len() > MAX_FILE_LEN {
        return Err(SourceError::FileTooLarge {
            len: meta.len(),
            max: MAX_FILE_LEN,
        });
    }
    if meta.len() == 0 {
        return Ok(Vec::new());
    }

    // Safety: the mapping is read-only and dropped before return; a
    // concurrent writer shearing the file is outside the threat model
    // (same exposure as any reader of a file being rewritten).
    let map = unsafe { Mmap::map(&file) }.map_err(SourceError::Io)?;
    let data: &[u8] = &map;

    let mut lines = Vec::with_capacity(1024);
    let mut start = 0;
    while start < data.len() {
        let end = memchr(b'\n', &data[start..]).map_or(data.len(), |i| start + i);
        let mut line = &data[start..end];
        if line.last() == Some(&b'\r') {
            line = &line[..line.len() - 1];
        }
        if lines.len() >= MAX_LINES {
            return Err(SourceError::TooManyLines { max: MAX_LINES });
        }
        lines.push(line.to_vec());
        start = end + 1;
    }
    Ok(lines)
}

/// Incremental `\n`-delimited reader with the per-line bound enforced
/// mid-read.
///
/// Yields lines with the trailing LF (and a preceding CR) stripped.
/// `bytes_consumed` counts every input byte including terminators, for
/// progress reporting.
pub struct LineReader<R: Read> {
    inner: R,
    chunk: Vec<u8>,
    pos: usize,
    len: usize,
    line: Vec<u8>,
    consumed: u64,
    eof: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            chunk: vec![0u8; CHUNK_LEN],
            pos: 0,
            len: 0,
            line: Vec::with_capacity(256),
            consumed: 0,
            eof: false,
        }
    }

    /// Input bytes consumed so far, terminators included.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Returns the next line, or `None` at end of input.
    ///
    /// The returned slice is valid until the next call. A line longer
    /// than the per-line limit aborts with a bounds violation as soon
    /// as the excess is observed.
    pub fn next_line(&mut self) -> Result<Option<&[u8]>, FilterError> {
        self.line.clear();
        let mut terminated = false;

        while !terminated {
            if self.pos == self.len {
                if self.eof {
                    break;
                }
                self.len = self.inner.read(&mut self.chunk).map_err(FilterError::Read)?;
                self.pos = 0;
                if self.len == 0 {
                    self.eof = true;
                    break;
                }
            }
            let hay = &self.chunk[self.pos..self.len];
            match memchr(b'\n', hay) {
                Some(i) => {
                    self.line.extend_from_slice(&hay[..i]);
                    self.pos += i + 1;
                    self.consumed += i as u64 + 1;
                    terminated = true;
                }
                None => {
                    self.line.extend_from_slice(hay);
                    self.consumed += hay.len() as u64;
                    self.pos = self.len;
                }
            }
            if self.line.len() > MAX_LINE_LEN {
                return Err(FilterError::LineTooLong {
                    len: self.line.len(),
                    max: MAX_LINE_LEN,
                });
            }
        }

        if !terminated && self.line.is_empty() {
            return Ok(None);
        }
        if self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        Ok(Some(&self.line))
    }
}
