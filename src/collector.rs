use std::sync::OnceLock;

use crate::dispatch::FetchOutcome;
use crate::error::FanoutError;

/// Per-batch result slots, one per ordinal.
///
/// Each slot is written at most once, by the task that owns that ordinal, so
/// writes to different ordinals never contend. Readers are expected to scan
/// only after every writer has been joined.
#[derive(Debug)]
pub struct ResultSet {
    slots: Box<[OnceLock<FetchOutcome>]>,
}

impl ResultSet {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| OnceLock::new()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store an outcome in the slot named by its ordinal.
    pub fn record(&self, outcome: FetchOutcome) -> Result<(), FanoutError> {
        let ordinal = outcome.ordinal;
        let slot = self.slots.get(ordinal).ok_or(FanoutError::SlotOutOfRange {
            ordinal,
            len: self.slots.len(),
        })?;
        slot.set(outcome).map_err(|_| FanoutError::SlotTaken(ordinal))
    }

    pub fn get(&self, ordinal: usize) -> Option<&FetchOutcome> {
        self.slots.get(ordinal).and_then(OnceLock::get)
    }

    /// Present outcomes in ordinal order.
    pub fn iter_present(&self) -> impl Iterator<Item = &FetchOutcome> {
        self.slots.iter().filter_map(OnceLock::get)
    }

    pub fn present_count(&self) -> usize {
        self.iter_present().count()
    }

    /// Ordinals whose fetch failed (or never reported).
    pub fn missing(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.get().is_none())
            .map(|(i, _)| i)
            .collect()
    }

    /// Largest latency among present outcomes, 0 when none succeeded.
    pub fn max_elapsed_ms(&self) -> u64 {
        self.iter_present().map(|o| o.elapsed_ms).max().unwrap_or(0)
    }
}
