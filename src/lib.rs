//! De-duplicating, canonicalizing filter for Valgrind/Memcheck logs.
//!
//! The core is a single-threaded streaming state machine:
//! 1) Classify each line (vg-prefix, report start, allocation header).
//! 2) Assemble consecutive lines into report blocks, keeping a scrubbed
//!    raw form for output and a canonical form for identity.
//! 3) Derive a signature key per block (whole canonical text, or the
//!    first `depth` canonical lines) and suppress duplicates.
//! 4) Honor the epoch marker: buffered mode locates the last marker up
//!    front; streaming mode resets accumulated state on every marker
//!    and commits the final epoch only after input ends.
//!
//! Pipeline flow:
//! Source -> LineReader -> LogFilter (classify/assemble/dedupe/epoch)
//! -> sink.
//!
//! Memory is bounded by hard limits: per line, per block, and for the
//! streaming pending queue. Violations are fatal, not recoverable.

pub mod canon;
pub mod classify;
pub mod errors;
pub mod filter;
pub mod options;
pub mod progress;
pub mod source;

/// Per-line limit in bytes.
pub const MAX_LINE_LEN: usize = 1024 * 1024;
/// Per-block aggregate raw limit in bytes.
pub const MAX_BLOCK_LEN: usize = 10 * 1024 * 1024;
/// Streaming pending-queue capacity in blocks.
pub const MAX_PENDING_BLOCKS: usize = 1000;

pub use canon::{canon, scrub};
pub use classify::{is_bytes_header, is_vg_line, strip_prefix, ReportStartMatcher};
pub use errors::{FilterError, SourceError};
pub use filter::{FilterStats, LogFilter};
pub use options::{
    Input, Options, OptionsError, DEFAULT_DEPTH, DEFAULT_MARKER, LARGE_FILE_THRESHOLD, MAX_DEPTH,
    MAX_MARKER_LEN,
};
pub use progress::{peak_rss_mb, report_memory, ProgressReporter};
pub use source::{
    is_large_file, open_file, read_file_lines, resolve_path, sanitize_path, LineReader,
    MAX_FILE_LEN, MAX_LINES,
};
