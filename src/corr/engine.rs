use super::nuclcov::pair_statistic;
use super::window::SlidingWindow;
use crate::config::CorrConfig;
use crate::vcf::{self, VariantRecord};
use bstr::{BString, ByteSlice};
use log::*;
use snafu::prelude::*;
use std::backtrace::Backtrace;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("max lag must be positive"))]
    InvalidMaxLag { backtrace: Option<Backtrace> },
    #[snafu(display("region start {start} is after region end {end}"))]
    InvalidRegion {
        start: u64,
        end: u64,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("positions are not sorted: {found} comes after {previous}"))]
    UnsortedPosition {
        previous: u64,
        found: u64,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("expected a single contig {first}, found {found}"))]
    MixedContigs {
        first: String,
        found: String,
        backtrace: Option<Backtrace>,
    },
    #[snafu(display("variant stream failed"))]
    Stream {
        #[snafu(backtrace)]
        source: vcf::Error,
    },
}

type Result<T> = std::result::Result<T, Error>;

/// Lag-indexed running sums of the pair statistic and pair counts
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulator {
    sums: Vec<f64>,
    counts: Vec<u64>,
}

impl Accumulator {
    pub fn new(max_lag: usize) -> Self {
        Self {
            sums: vec![0.0; max_lag],
            counts: vec![0; max_lag],
        }
    }

    pub fn add(&mut self, lag: usize, value: f64) {
        self.sums[lag] += value;
        self.counts[lag] += 1;
    }

    pub fn sums(&self) -> &[f64] {
        &self.sums
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn sum(&self, lag: usize) -> f64 {
        self.sums[lag]
    }

    pub fn count(&self, lag: usize) -> u64 {
        self.counts[lag]
    }

    /// Lags with at least one contributing pair
    pub fn observed_lags(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, c)| **c > 0)
            .map(|(lag, _)| lag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Accepting,
    /// region end passed; the window has been flushed for the last time
    Draining,
    Done,
}

/// What `feed` did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Buffered,
    BeforeRegion,
    /// the record passed the region end and stopped the engine
    PastRegion,
    /// the engine was no longer accepting
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub admitted: usize,
    pub before_region: usize,
    pub pairs: u64,
    /// pairs without any sample slot called at both sites
    pub undefined_pairs: u64,
    pub max_window_len: usize,
}

/// Streams position-sorted records through a sliding window and folds
/// every within-window site pair into an [`Accumulator`].
///
/// Each admitted record is flushed as the window front exactly once: either
/// when a later record lies `max_lag` or more past it, or when the window is
/// drained at the end of the run.
#[derive(Debug)]
pub struct CorrelationEngine {
    region_start: u64,
    region_end: u64,
    window: SlidingWindow,
    acc: Accumulator,
    state: EngineState,
    contig: Option<BString>,
    last_pos: Option<u64>,
    stats: EngineStats,
}

impl CorrelationEngine {
    pub fn new(config: &CorrConfig) -> Result<Self> {
        ensure!(config.max_lag > 0, InvalidMaxLagSnafu {});
        ensure!(
            config.region_start <= config.region_end,
            InvalidRegionSnafu {
                start: config.region_start,
                end: config.region_end,
            }
        );
        Ok(Self {
            region_start: config.region_start,
            region_end: config.region_end,
            window: SlidingWindow::new(config.max_lag as u64),
            acc: Accumulator::new(config.max_lag),
            state: EngineState::Accepting,
            contig: None,
            last_pos: None,
            stats: EngineStats::default(),
        })
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn accumulator(&self) -> &Accumulator {
        &self.acc
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    pub fn feed(&mut self, rec: VariantRecord) -> Result<Admission> {
        if self.state != EngineState::Accepting {
            return Ok(Admission::Ignored);
        }
        self.check_order(&rec)?;

        if rec.pos() < self.region_start {
            debug!("skip record at {} before region start", rec.pos());
            self.stats.before_region += 1;
            return Ok(Admission::BeforeRegion);
        }
        if rec.pos() > self.region_end {
            info!(
                "record at {} is past region end {}; stop reading",
                rec.pos(),
                self.region_end
            );
            self.drain();
            self.state = EngineState::Draining;
            return Ok(Admission::PastRegion);
        }

        while self.window.front_expired(rec.pos()) {
            self.flush_front();
            self.window.pop_front();
        }
        self.window.push_back(rec);
        self.stats.admitted += 1;
        self.stats.max_window_len = self.stats.max_window_len.max(self.window.len());
        Ok(Admission::Buffered)
    }

    /// Feed records until the stream ends, fails, or passes the region end.
    ///
    /// No record is pulled once the engine stops accepting.
    pub fn run<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<VariantRecord, vcf::Error>>,
    {
        let mut records = records.into_iter();
        while self.state == EngineState::Accepting {
            let Some(rec) = records.next() else {
                break;
            };
            self.feed(rec.context(StreamSnafu {})?)?;
        }
        Ok(())
    }

    /// Flush whatever is left in the window; no record is accepted afterwards
    pub fn finish(&mut self) -> &Accumulator {
        if self.state != EngineState::Done {
            self.drain();
            self.state = EngineState::Done;
            info!(
                "admitted {} records, accumulated {} site pairs ({} undefined), max window {} records",
                self.stats.admitted,
                self.stats.pairs,
                self.stats.undefined_pairs,
                self.stats.max_window_len
            );
        }
        &self.acc
    }

    /// Finish the run and take the accumulator and counters
    pub fn into_parts(mut self) -> (Accumulator, EngineStats) {
        self.finish();
        (self.acc, self.stats)
    }

    fn check_order(&mut self, rec: &VariantRecord) -> Result<()> {
        match &self.contig {
            Some(contig) => ensure!(
                contig.as_bstr() == rec.chrom(),
                MixedContigsSnafu {
                    first: contig.to_string(),
                    found: rec.chrom().to_string(),
                }
            ),
            None => self.contig = Some(BString::from(rec.chrom().to_vec())),
        }
        if let Some(previous) = self.last_pos {
            ensure!(
                previous <= rec.pos(),
                UnsortedPositionSnafu {
                    previous,
                    found: rec.pos(),
                }
            );
        }
        self.last_pos = Some(rec.pos());
        Ok(())
    }

    fn flush_front(&mut self) {
        for (lag, front, other) in self.window.front_pairs() {
            match pair_statistic(front.genotypes(), other.genotypes()) {
                Some(value) => {
                    self.acc.add(lag, value);
                    self.stats.pairs += 1;
                }
                None => self.stats.undefined_pairs += 1,
            }
        }
    }

    fn drain(&mut self) {
        while !self.window.is_empty() {
            self.flush_front();
            self.window.pop_front();
        }
    }
}
