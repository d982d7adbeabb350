//! Filter selection table
//!
//! The single piece of state shared between the control thread and the
//! render thread: for every channel, the filter key most recently requested.
//!
//! The control thread locks a slot to write it. The render thread never
//! blocks: it checks an atomic dirty flag and then only `try_lock`s, reading
//! the key in place. A contended slot is simply retried on the next block.
//! Keys never leave the slot, so nothing is freed on the render thread.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use binsim_core::FilterKey;

use crate::{EngineError, EngineResult};

#[derive(Debug, Default)]
struct SlotState {
    key: Option<FilterKey>,
    /// Incremented on every accepted write
    generation: u64,
}

#[derive(Debug, Default)]
struct Slot {
    dirty: AtomicBool,
    state: Mutex<SlotState>,
}

/// Per-channel filter requests, last writer wins
#[derive(Debug)]
pub struct FilterSelectionTable {
    slots: Box<[Slot]>,
}

impl FilterSelectionTable {
    pub fn new(channels: usize) -> Self {
        Self {
            slots: (0..channels).map(|_| Slot::default()).collect(),
        }
    }

    /// Table with every channel requesting `key`
    pub fn with_default(channels: usize, key: &FilterKey) -> Self {
        let table = Self::new(channels);
        for channel in 0..channels {
            // In range by construction
            let _ = table.set(channel, key.clone());
        }
        table
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.slots.len()
    }

    /// Request `key` for `channel`
    ///
    /// Returns `false` when the channel already requests this key.
    /// Control thread only; may block briefly.
    pub fn set(&self, channel: usize, key: FilterKey) -> EngineResult<bool> {
        let slot = self.slot(channel)?;
        {
            let mut state = slot.state.lock();
            if state.key.as_ref() == Some(&key) {
                return Ok(false);
            }
            state.key = Some(key);
            state.generation += 1;
        }
        slot.dirty.store(true, Ordering::Release);
        Ok(true)
    }

    /// Latest requested key per channel
    pub fn snapshot(&self) -> Vec<Option<FilterKey>> {
        self.slots
            .iter()
            .map(|slot| slot.state.lock().key.clone())
            .collect()
    }

    /// Read `channel`'s key if it changed since `seen`, without blocking
    ///
    /// `seen` is the caller's record of the last generation it consumed and
    /// is updated on success. Render thread only.
    pub fn poll<R>(
        &self,
        channel: usize,
        seen: &mut u64,
        read: impl FnOnce(&FilterKey) -> R,
    ) -> Option<R> {
        let slot = self.slots.get(channel)?;
        if !slot.dirty.swap(false, Ordering::Acquire) {
            return None;
        }

        let Some(state) = slot.state.try_lock() else {
            slot.dirty.store(true, Ordering::Release);
            return None;
        };
        if state.generation == *seen {
            return None;
        }
        *seen = state.generation;
        state.key.as_ref().map(read)
    }

    fn slot(&self, channel: usize) -> EngineResult<&Slot> {
        self.slots.get(channel).ok_or(EngineError::ChannelOutOfRange {
            channel,
            channels: self.slots.len(),
        })
    }
}
