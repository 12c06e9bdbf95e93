use std::time::Instant;

/// Progress of a single file upload.
///
/// A file yields zero or more `Progress` values followed by exactly one
/// `Completed` carrying the public location of the assembled object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadProgress {
    /// Percentage of the file acknowledged by the store, 0–100.
    Progress(u8),
    /// Public location of the uploaded object.
    Completed(String),
}

/// Tracks acknowledged parts of one file.
///
/// Parts may finish out of order; the reported percentage never
/// decreases.
#[derive(Debug, Clone)]
pub struct PartProgress {
    total_bytes: u64,
    total_parts: usize,
    done_bytes: u64,
    done_parts: usize,
    last_percent: u8,
}

impl PartProgress {
    pub fn new(total_bytes: u64, total_parts: usize) -> Self {
        Self {
            total_bytes,
            total_parts,
            done_bytes: 0,
            done_parts: 0,
            last_percent: 0,
        }
    }

    /// Records one acknowledged part of `bytes` length and returns the new percentage.
    pub fn record(&mut self, bytes: u64) -> u8 {
        self.done_parts = (self.done_parts + 1).min(self.total_parts);
        self.done_bytes = (self.done_bytes + bytes).min(self.total_bytes);

        let percent = if self.total_bytes > 0 {
            self.done_bytes * 100 / self.total_bytes
        } else if self.total_parts > 0 {
            (self.done_parts * 100 / self.total_parts) as u64
        } else {
            100
        };
        self.last_percent = self.last_percent.max(percent as u8);
        self.last_percent
    }
}

/// Average transfer speed over the lifetime of one upload.
pub struct SpeedCalculator {
    started: Instant,
    bytes: u64,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeedCalculator {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            bytes: 0,
        }
    }

    pub fn add(&mut self, bytes: u64) {
        self.bytes += bytes;
    }

    /// Returns 0.0 until measurable time has passed.
    pub fn bytes_per_second(&self) -> f64 {
        let elapsed = self.started.elapsed();
        if elapsed.is_zero() {
            return 0.0;
        }
        self.bytes as f64 / elapsed.as_secs_f64()
    }
}
