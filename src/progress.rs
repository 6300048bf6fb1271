//! Progress and memory reporting on stderr.
//!
//! Both are observation hooks: they never touch stdout (the payload
//! channel) and are inert unless explicitly enabled by the caller.

/// Bytes of input between progress reports.
pub const PROGRESS_INTERVAL: u64 = 1024 * 1024;

const MB: u64 = 1024 * 1024;

/// Carriage-return progress line for a file of known size.
///
/// With an unknown total (stdin), every call is a no-op.
pub struct ProgressReporter {
    label: String,
    total: u64,
    next_report: u64,
}

impl ProgressReporter {
    pub fn new(label: &str, total: u64) -> Self {
        Self {
            label: label.to_string(),
            total,
            next_report: PROGRESS_INTERVAL,
        }
    }

    /// Reports roughly once per [`PROGRESS_INTERVAL`] consumed bytes.
    pub fn tick(&mut self, done: u64) {
        if self.total == 0 || done < self.next_report {
            return;
        }
        self.render(done);
        while self.next_report <= done {
            self.next_report += PROGRESS_INTERVAL;
        }
    }

    /// Final report; terminates the carriage-return line.
    pub fn finish(&mut self, done: u64) {
        if self.total == 0 {
            return;
        }
        self.render(done);
        eprintln!();
    }

    fn render(&self, done: u64) {
        let done = done.min(self.total);
        let pct = done * 100 / self.total;
        eprint!(
            "\rProcessing {}: {}% ({}/{} MB)",
            self.label,
            pct,
            done / MB,
            self.total / MB
        );
    }
}

/// Peak RSS of this process in MiB, when the platform exposes it.
#[cfg(target_os = "linux")]
pub fn peak_rss_mb() -> Option<u64> {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // Safety: getrusage writes the full struct on success.
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if rc != 0 {
        return None;
    }
    let usage = unsafe { usage.assume_init() };
    // ru_maxrss is KiB on Linux.
    Some(usage.ru_maxrss as u64 / 1024)
}

#[cfg(not(target_os = "linux"))]
pub fn peak_rss_mb() -> Option<u64> {
    None
}

/// One-line memory report on stderr, silent when unavailable.
pub fn report_memory(stage: &str, label: &str) {
    if let Some(mb) = peak_rss_mb() {
        if label.is_empty() {
            eprintln!("Memory usage during {stage}: {mb} MB");
        } else {
            eprintln!("Memory usage during {stage} for {label}: {mb} MB");
        }
    }
}
