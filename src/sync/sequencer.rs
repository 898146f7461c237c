//! Per-entity ordering for reconciliation.
//!
//! Each entity ID gets its own async gate; holding a [`SequenceGuard`] means
//! no other reconciliation for that ID can write to the local snapshot. Gates
//! are FIFO, so operations on one ID settle in the order they were started.
//!
//! Every committed guard stamps the ID with a tick from a shared clock. A list
//! fetch records a [`Sequencer::watermark`] before going to the network and
//! afterwards asks which IDs were committed since, so a listing that left
//! before a write was confirmed cannot roll that write back.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
struct Entry {
    gate: Arc<AsyncMutex<()>>,
    committed_at: u64,
}

impl Entry {
    /// Nobody holds or waits on the gate; only the table owns it.
    fn idle(&self) -> bool {
        Arc::strong_count(&self.gate) == 1
    }
}

#[derive(Default)]
struct Table {
    clock: u64,
    entries: HashMap<String, Entry>,
    /// Outstanding watermarks, tick -> count.
    marks: BTreeMap<u64, usize>,
}

impl Table {
    /// Drop idle entries that no outstanding watermark can still report.
    fn prune(&mut self) {
        let floor = self.marks.keys().next().copied();
        self.entries.retain(|_, entry| {
            !entry.idle() || floor.is_some_and(|floor| entry.committed_at > floor)
        });
    }
}

#[derive(Default)]
pub struct Sequencer {
    table: Mutex<Table>,
}

pub struct SequenceGuard<'a> {
    sequencer: &'a Sequencer,
    key: String,
    _gate: OwnedMutexGuard<()>,
}

/// Clock reading taken before a list fetch. Entries committed after it are
/// kept until it is dropped.
pub struct Watermark<'a> {
    sequencer: &'a Sequencer,
    tick: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        match self.table.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> SequenceGuard<'_> {
        let gate = {
            let mut table = self.table();
            table.prune();
            table.entries.entry(key.to_string()).or_default().gate.clone()
        };
        let gate = gate.lock_owned().await;
        SequenceGuard {
            sequencer: self,
            key: key.to_string(),
            _gate: gate,
        }
    }

    /// Current clock reading; commits after this point compare greater.
    pub fn watermark(&self) -> Watermark<'_> {
        let mut table = self.table();
        let tick = table.clock;
        *table.marks.entry(tick).or_default() += 1;
        Watermark {
            sequencer: self,
            tick,
        }
    }

    pub fn committed_since(&self, watermark: &Watermark<'_>) -> HashSet<String> {
        self.table()
            .entries
            .iter()
            .filter(|(_, entry)| entry.committed_at > watermark.tick)
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn commit(&self, key: &str) {
        let mut table = self.table();
        table.clock += 1;
        let tick = table.clock;
        table.entries.entry(key.to_string()).or_default().committed_at = tick;
    }

    fn release(&self, tick: u64) {
        let mut table = self.table();
        if let Some(count) = table.marks.get_mut(&tick) {
            *count -= 1;
            if *count == 0 {
                table.marks.remove(&tick);
            }
        }
        table.prune();
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.table().entries.len()
    }
}

impl SequenceGuard<'_> {
    /// Record that this guard's outcome reached the local snapshot.
    pub fn commit(&self) {
        self.sequencer.commit(&self.key);
    }

    /// Record the outcome under another key as well, for a provisional ID
    /// that the server replaced.
    pub fn commit_alias(&self, key: &str) {
        self.sequencer.commit(key);
    }
}

impl Drop for Watermark<'_> {
    fn drop(&mut self) {
        self.sequencer.release(self.tick);
    }
}
