use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::{CounterMap, EngineError, ExecutionSnapshot, Phase};

/// Runtime-resident counter store for one program run.
///
/// One atomic slot per counter index; increments are safe under the traced
/// program's own concurrency and each touches a single independent slot.
/// The store is created per run and reset or dropped between runs. It is
/// deliberately not a process-wide singleton, so no state leaks across
/// unrelated test executions.
///
/// An out-of-range index means the instrumented artifact and this store
/// were built from different counter maps; that is a fatal desync, never a
/// silently ignored increment.
pub struct CounterStore {
    unit_name: String,
    slots: Vec<AtomicU64>,
}

impl CounterStore {
    pub fn new(unit_name: impl Into<String>, len: usize) -> Self {
        Self {
            unit_name: unit_name.into(),
            slots: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    /// Size the store from the counter map the artifact was built with
    pub fn for_map(map: &CounterMap) -> Self {
        Self::new(map.unit_name.clone(), map.len())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn increment(&self, index: u32) -> Result<(), EngineError> {
        match self.slots.get(index as usize) {
            Some(slot) => {
                slot.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            None => Err(self.desync(index, Phase::Increment)),
        }
    }

    /// Point-in-time read of every slot. Does not reset counters, so
    /// repeated snapshots within a run are monotonically non-decreasing.
    pub fn snapshot(&self) -> ExecutionSnapshot {
        let mut snap = ExecutionSnapshot::default();
        for (index, slot) in self.slots.iter().enumerate() {
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                snap.counts.insert(index as u32, count);
            }
        }
        snap
    }

    /// Partial snapshot of an index subset, for incremental flushing from
    /// long-running programs
    pub fn snapshot_indices(&self, indices: &[u32]) -> Result<ExecutionSnapshot, EngineError> {
        let mut snap = ExecutionSnapshot::default();
        for &index in indices {
            let slot = self
                .slots
                .get(index as usize)
                .ok_or_else(|| self.desync(index, Phase::Snapshot))?;
            let count = slot.load(Ordering::Relaxed);
            if count > 0 {
                snap.counts.insert(index, count);
            }
        }
        Ok(snap)
    }

    /// Zero every slot; called between runs when the store is reused
    pub fn reset(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }

    fn desync(&self, index: u32, phase: Phase) -> EngineError {
        EngineError::CounterDesync {
            unit: self.unit_name.clone(),
            index,
            slots: self.slots.len() as u32,
            phase,
        }
    }
}
