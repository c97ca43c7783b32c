//! An append-only measurement log, shared by both simulators.
//!
//! Results accumulate in `bits`; `flush` copies everything written so far to
//! a caller-supplied sink and advances a high-water mark, so a long-running
//! sampling loop doesn't have to hold the entire shot history in memory.
//!
//! Separately, a record can be given a high-water row count: once `bits`
//! exceeds it, `record` itself evicts everything but the last `keep` rows
//! into an internal ASCII buffer, bounding the live `bits` window regardless
//! of how long the run goes or whether/when the caller ever calls `flush`.
//! `keep` must be at least as large as the longest lookback any later
//! operation can make into this record.

use std::io::{self, Write};

use crate::error::CoreResult;

#[derive(Debug, Default)]
pub struct MeasurementRecord {
    bits: Vec<bool>,
    /// ASCII `0`/`1` for every row evicted from `bits` by the high-water-mark
    /// trim; always a prefix of the full row history, immediately followed
    /// by `bits` in logical order.
    retired: Vec<u8>,
    /// How many rows (counting from the very first, across `retired` and
    /// `bits` combined) have already been written to some `flush` sink.
    total_flushed: usize,
    high_water_mark: Option<usize>,
    keep: usize,
}

impl MeasurementRecord {
    pub fn new() -> Self {
        MeasurementRecord { bits: Vec::new(), retired: Vec::new(), total_flushed: 0, high_water_mark: None, keep: 0 }
    }

    /// A record that auto-trims: once `bits` exceeds `high_water_mark` rows,
    /// `record` evicts the oldest rows down to `keep`, parking their ASCII
    /// encoding in an internal buffer instead of holding them live forever.
    pub fn with_high_water_mark(high_water_mark: usize, keep: usize) -> Self {
        assert!(keep <= high_water_mark, "keep window can't exceed the high-water mark itself");
        MeasurementRecord {
            bits: Vec::new(),
            retired: Vec::new(),
            total_flushed: 0,
            high_water_mark: Some(high_water_mark),
            keep,
        }
    }

    /// Total rows recorded so far, including any already evicted into the
    /// retired buffer.
    pub fn len(&self) -> usize {
        self.retired.len() + self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn record(&mut self, outcome: bool) {
        self.bits.push(outcome);
        self.trim_to_high_water_mark();
    }

    fn trim_to_high_water_mark(&mut self) {
        let Some(high_water_mark) = self.high_water_mark else { return };
        if self.bits.len() <= high_water_mark {
            return;
        }
        let evict = self.bits.len() - self.keep;
        self.retired.extend(self.bits.drain(..evict).map(|b| if b { b'1' } else { b'0' }));
    }

    /// Overwrites the most recently recorded bit, e.g. to report a noisy
    /// measurement's flipped outcome without disturbing the true result
    /// that was already used to decide state collapse. The last bit is
    /// always still live in `bits`: `keep` (when a high-water mark is set)
    /// is required to cover at least this case.
    pub fn overwrite_last(&mut self, outcome: bool) {
        let last = self.bits.len() - 1;
        self.bits[last] = outcome;
    }

    /// `lookback(-1)` is the most recent measurement, `lookback(-2)` the one
    /// before it, and so on; `None` if there aren't that many yet, or if
    /// they've already been evicted past the retained `keep` window.
    pub fn lookback(&self, offset: isize) -> Option<bool> {
        assert!(offset < 0, "lookback offsets are negative, counting back from the most recent result");
        let back = (-offset) as usize;
        if back > self.bits.len() {
            return None;
        }
        Some(self.bits[self.bits.len() - back])
    }

    /// Writes every bit recorded since the last flush to `out`, one ASCII
    /// `0`/`1` per bit, and advances the high-water mark.
    pub fn flush(&mut self, out: &mut impl Write) -> CoreResult<()> {
        if self.total_flushed < self.retired.len() {
            out.write_all(&self.retired[self.total_flushed..]).map_err(io_err)?;
        }
        let bits_flushed_from = self.total_flushed.saturating_sub(self.retired.len());
        if bits_flushed_from < self.bits.len() {
            let mut buf = Vec::with_capacity(self.bits.len() - bits_flushed_from);
            for &b in &self.bits[bits_flushed_from..] {
                buf.push(if b { b'1' } else { b'0' });
            }
            out.write_all(&buf).map_err(io_err)?;
        }
        self.total_flushed = self.retired.len() + self.bits.len();
        Ok(())
    }

    /// Drops everything already flushed, keeping memory bounded across a
    /// long sampling run. `lookback` past the truncation point returns
    /// `None` rather than panicking.
    pub fn truncate_flushed(&mut self) {
        if self.total_flushed <= self.retired.len() {
            self.retired.drain(..self.total_flushed);
        } else {
            let bits_drain = self.total_flushed - self.retired.len();
            self.retired.clear();
            self.bits.drain(..bits_drain);
        }
        self.total_flushed = 0;
    }
}

fn io_err(e: io::Error) -> crate::error::CoreError {
    crate::error::CoreError::Io(e.to_string())
}
