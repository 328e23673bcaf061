//! Splitting a card list into bounded output files.
//!
//! A card list is a multiset of card units in print order. `partition` cuts
//! that sequence into groups of at most `job_size` units, keeping runs of the
//! same card together inside a group. A card whose units straddle a group
//! boundary appears as one run on each side.

use serde::{Deserialize, Serialize};

use crate::job::CardRequest;

/// Contiguous copies of one card inside a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    /// Index into the request's card list.
    pub card_index: usize,
    pub count: u32,
}

/// The runs that make up one output file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub runs: Vec<Run>,
}

impl Partition {
    /// Total card units in this partition.
    pub fn unit_count(&self) -> usize {
        self.runs.iter().map(|r| r.count as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn push_units(&mut self, card_index: usize, count: u32) {
        match self.runs.last_mut() {
            Some(last) if last.card_index == card_index => last.count += count,
            _ => self.runs.push(Run { card_index, count }),
        }
    }
}

/// Capacity of one partition.
///
/// `page_capacity * split` when a split is requested, otherwise everything
/// goes into a single partition. The product saturates at `usize::MAX`.
pub fn job_size(total_units: usize, page_capacity: usize, split: Option<usize>) -> usize {
    match split {
        Some(pages) => page_capacity.saturating_mul(pages),
        None => total_units,
    }
}

/// Groups the units of `cards` into partitions of at most `job_size` units.
///
/// Every partition except the last holds exactly `job_size` units. A
/// `job_size` of 0 places everything in a single partition.
pub fn partition(cards: &[CardRequest], job_size: usize) -> Vec<Partition> {
    let capacity = if job_size == 0 { usize::MAX } else { job_size };
    let mut partitions = Vec::new();
    let mut current = Partition::default();
    let mut filled = 0usize;

    for (card_index, card) in cards.iter().enumerate() {
        let mut remaining = card.count as usize;
        while remaining > 0 {
            let take = remaining.min(capacity - filled);
            current.push_units(card_index, take as u32);
            filled += take;
            remaining -= take;

            if filled == capacity {
                partitions.push(std::mem::take(&mut current));
                filled = 0;
            }
        }
    }

    if !current.is_empty() {
        partitions.push(current);
    }

    partitions
}
