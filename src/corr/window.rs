use crate::vcf::VariantRecord;
use std::collections::VecDeque;

/// Records close enough to the oldest one to still pair with it.
///
/// The width is in position units; how many records fit depends on the
/// local variant density.
#[derive(Debug)]
pub struct SlidingWindow {
    records: VecDeque<VariantRecord>,
    max_lag: u64,
}

impl SlidingWindow {
    pub fn new(max_lag: u64) -> Self {
        Self {
            records: VecDeque::new(),
            max_lag,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn front(&self) -> Option<&VariantRecord> {
        self.records.front()
    }

    pub fn back(&self) -> Option<&VariantRecord> {
        self.records.back()
    }

    /// distance between the oldest and the newest record
    pub fn span(&self) -> u64 {
        match (self.front(), self.back()) {
            (Some(f), Some(b)) => b.pos() - f.pos(),
            _ => 0,
        }
    }

    /// Whether a record at `pos` is too far from the front to join it
    pub fn front_expired(&self, pos: u64) -> bool {
        self.records
            .front()
            .map_or(false, |f| pos.saturating_sub(f.pos()) >= self.max_lag)
    }

    pub fn push_back(&mut self, rec: VariantRecord) {
        self.records.push_back(rec);
    }

    pub fn pop_front(&mut self) -> Option<VariantRecord> {
        self.records.pop_front()
    }

    /// The front paired with every record in the window, itself first.
    ///
    /// Items are `(lag, front, other)`.
    pub fn front_pairs(&self) -> impl Iterator<Item = (usize, &VariantRecord, &VariantRecord)> {
        self.records.front().into_iter().flat_map(move |front| {
            self.records
                .iter()
                .map(move |other| ((other.pos() - front.pos()) as usize, front, other))
        })
    }
}
