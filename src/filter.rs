//! The log-processing core: block assembly, deduplication, epoch
//! control, and output.
//!
//! Why a single-threaded pass with explicit state?
//! - Output order must equal flush acceptance order; one thread makes
//!   that trivial.
//! - Memory stays bounded and easy to reason about: one in-progress
//!   block, one seen-set, one capped pending queue.
//!
//! Flow (one line):
//! 1) Marker check (streaming + trim) -> epoch reset.
//! 2) vg-line gate, prefix strip.
//! 3) Report-start check -> flush previous block; bytes headers are
//!    discarded after terminating the block they close.
//! 4) Scrub (raw) + canonicalize (signature), append to the block.
//!
//! Flush derives the signature key, consults the seen-set, and either
//! writes the block (buffered) or queues it (streaming). Streaming
//! emission happens once, after the input is exhausted, and only if the
//! final epoch survived.

use std::collections::VecDeque;
use std::io::{Read, Write};

use ahash::AHashSet;
use memchr::memmem;

use crate::canon::{canon, scrub, trim_space};
use crate::classify::{is_bytes_header, is_vg_line, strip_prefix, ReportStartMatcher};
use crate::errors::FilterError;
use crate::options::Options;
use crate::progress::ProgressReporter;
use crate::source::LineReader;
use crate::{MAX_BLOCK_LEN, MAX_LINE_LEN, MAX_PENDING_BLOCKS};

/// Summary counters for one filter run.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilterStats {
    /// Lines presented to the filter.
    pub lines: u64,
    /// Lines carrying a valid `==PID==` prefix.
    pub vg_lines: u64,
    /// Blocks accepted (written or queued).
    pub blocks_emitted: u64,
    /// Blocks suppressed as duplicates.
    pub blocks_suppressed: u64,
    /// Epoch resets triggered by the marker (streaming mode).
    pub epoch_resets: u64,
    /// Input bytes consumed, newlines included.
    pub bytes: u64,
}

/// Streaming state machine over Valgrind log lines.
///
/// Owns the in-progress block, the per-epoch seen-set, and (in
/// streaming mode) the pending queue. The sink is written, never read.
pub struct LogFilter<W: Write> {
    opt: Options,
    sink: W,
    marker: memmem::Finder<'static>,
    starts: ReportStartMatcher,

    // In-progress block.
    raw: Vec<u8>,
    sig: Vec<u8>,
    sig_lines: Vec<Vec<u8>>,

    seen: AHashSet<Vec<u8>>,
    pending: VecDeque<Vec<u8>>,
    marker_seen: bool,
    stats: FilterStats,
}

impl<W: Write> LogFilter<W> {
    pub fn new(opt: Options, sink: W) -> Self {
        let marker = memmem::Finder::new(&opt.marker).into_owned();
        Self {
            opt,
            sink,
            marker,
            starts: ReportStartMatcher::new(),
            raw: Vec::new(),
            sig: Vec::new(),
            sig_lines: Vec::with_capacity(64),
            seen: AHashSet::with_capacity(256),
            pending: VecDeque::new(),
            marker_seen: false,
            stats: FilterStats::default(),
        }
    }

    /// Counters for the run so far.
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Feeds one LF-stripped input line through the state machine.
    pub fn feed_line(&mut self, line: &[u8]) -> Result<(), FilterError> {
        if line.len() > MAX_LINE_LEN {
            return Err(FilterError::LineTooLong {
                len: line.len(),
                max: MAX_LINE_LEN,
            });
        }
        self.stats.lines += 1;
        self.stats.bytes += line.len() as u64 + 1;

        // Marker match is byte-wise on the unmodified line, vg-prefixed
        // or not. The marker line itself is never assembled.
        if self.opt.trim && self.opt.stream_mode && self.marker.find(line).is_some() {
            self.reset_epoch();
            self.marker_seen = true;
            self.stats.epoch_resets += 1;
            return Ok(());
        }

        if !is_vg_line(line) {
            return Ok(());
        }
        self.stats.vg_lines += 1;
        let stripped = strip_prefix(line);

        if self.starts.is_report_start(stripped) {
            self.flush()?;
            // An allocation-summary header only terminates the block
            // before it; it never opens one.
            if is_bytes_header(stripped) {
                return Ok(());
            }
        }

        let raw_line = if self.opt.scrub_raw {
            scrub(stripped)
        } else {
            stripped.to_vec()
        };
        if trim_space(&raw_line).is_empty() {
            return Ok(());
        }

        self.raw.extend_from_slice(&raw_line);
        self.raw.push(b'\n');
        if self.raw.len() > MAX_BLOCK_LEN {
            return Err(FilterError::BlockTooLarge {
                len: self.raw.len(),
                max: MAX_BLOCK_LEN,
            });
        }

        let canonical = canon(stripped);
        self.sig.extend_from_slice(&canonical);
        self.sig.push(b'\n');
        self.sig_lines.push(canonical);
        Ok(())
    }

    /// Terminates the in-progress block and accepts it if its signature
    /// key is new in this epoch.
    fn flush(&mut self) -> Result<(), FilterError> {
        if self.raw.is_empty() {
            self.clear_block();
            return Ok(());
        }

        let key = self.signature_key();
        if self.seen.insert(key) {
            if self.opt.stream_mode {
                if self.pending.len() >= MAX_PENDING_BLOCKS {
                    return Err(FilterError::PendingOverflow {
                        count: self.pending.len() + 1,
                        max: MAX_PENDING_BLOCKS,
                    });
                }
                let mut block = Vec::with_capacity(self.raw.len() + 1);
                block.extend_from_slice(&self.raw);
                block.push(b'\n');
                self.pending.push_back(block);
            } else {
                self.sink.write_all(&self.raw).map_err(FilterError::Write)?;
                self.sink.write_all(b"\n").map_err(FilterError::Write)?;
            }
            self.stats.blocks_emitted += 1;
        } else {
            self.stats.blocks_suppressed += 1;
        }
        self.clear_block();
        Ok(())
    }

    /// Whole canonical block when depth is 0, else the first `depth`
    /// canonical lines (all of them when the block is shorter).
    fn signature_key(&self) -> Vec<u8> {
        if self.opt.depth == 0 {
            return self.sig.clone();
        }
        let take = self.opt.depth.min(self.sig_lines.len());
        let mut key = Vec::with_capacity(256);
        for line in &self.sig_lines[..take] {
            key.extend_from_slice(line);
            key.push(b'\n');
        }
        key
    }

    fn clear_block(&mut self) {
        self.raw.clear();
        self.sig.clear();
        self.sig_lines.clear();
    }

    fn reset_epoch(&mut self) {
        self.clear_block();
        self.pending.clear();
        self.seen.clear();
    }

    /// Final flush and (in streaming mode) pending emission.
    ///
    /// With trimming on and no marker ever seen, streaming emits
    /// nothing: the whole input belongs to a discarded epoch.
    pub fn finish(&mut self) -> Result<FilterStats, FilterError> {
        self.flush()?;
        if self.opt.stream_mode {
            if !self.opt.trim || self.marker_seen {
                for block in &self.pending {
                    self.sink.write_all(block).map_err(FilterError::Write)?;
                }
            }
            self.pending.clear();
        }
        self.sink.flush().map_err(FilterError::Write)?;
        Ok(self.stats)
    }

    /// Streaming driver: one pass over a bounded line reader.
    pub fn run_streaming<R: Read>(
        &mut self,
        reader: &mut LineReader<R>,
        mut progress: Option<&mut ProgressReporter>,
    ) -> Result<FilterStats, FilterError> {
        loop {
            let Some(line) = reader.next_line()? else {
                break;
            };
            self.feed_line(line)?;
            if let Some(p) = progress.as_deref_mut() {
                p.tick(reader.bytes_consumed());
            }
        }
        if let Some(p) = progress.as_deref_mut() {
            p.finish(reader.bytes_consumed());
        }
        self.finish()
    }

    /// Buffered driver: the whole input is materialized, so trimming
    /// can locate the last marker exactly before any line is fed.
    pub fn run_buffered(&mut self, lines: &[Vec<u8>]) -> Result<FilterStats, FilterError> {
        let start = if self.opt.trim {
            match self.find_last_marker(lines) {
                Some(idx) => idx + 1,
                // Trimming requested but no marker: nothing to emit.
                None => return Ok(self.stats),
            }
        } else {
            0
        };
        for line in &lines[start..] {
            self.feed_line(line)?;
        }
        self.finish()
    }

    fn find_last_marker(&self, lines: &[Vec<u8>]) -> Option<usize> {
        lines.iter().rposition(|l| self.marker.find(l).is_some())
    }
}
