//! Id-map and pending queue for pre-handled Speak directives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::record::SpeakRecord;

/// Records are shared between the map, the queue, and the current-speaker
/// slot; the inner mutex is a leaf lock taken only on the executor.
pub type SharedRecord = Arc<Mutex<SpeakRecord>>;

/// `messageId → record` map plus the FIFO activation queue.
///
/// Lock order when both are needed: queue before map.
pub struct DirectiveStore {
    queue: Mutex<VecDeque<SharedRecord>>,
    map: Mutex<HashMap<String, SharedRecord>>,
}

impl Default for DirectiveStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectiveStore {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            map: Mutex::new(HashMap::new()),
        }
    }

    /// Insert a record keyed by its message id. Returns false and leaves the
    /// existing entry authoritative on a duplicate id.
    pub fn register(&self, record: SharedRecord) -> bool {
        let message_id = lock_record(&record).message_id().to_owned();
        let mut map = self.lock_map();
        if map.contains_key(&message_id) {
            return false;
        }
        map.insert(message_id, record);
        true
    }

    pub fn lookup(&self, message_id: &str) -> Option<SharedRecord> {
        self.lock_map().get(message_id).map(Arc::clone)
    }

    pub fn remove(&self, message_id: &str) {
        self.lock_map().remove(message_id);
    }

    /// Append to the pending queue. Returns true when the queue was empty
    /// before the append.
    pub fn enqueue(&self, record: SharedRecord) -> bool {
        let mut queue = self.lock_queue();
        let was_empty = queue.is_empty();
        queue.push_back(record);
        was_empty
    }

    /// Remove and return the head of the pending queue.
    pub fn dequeue_head(&self) -> Option<SharedRecord> {
        self.lock_queue().pop_front()
    }

    /// Remove a specific queued record (cancel path). Returns true when it
    /// was queued.
    pub fn unqueue(&self, message_id: &str) -> bool {
        let mut queue = self.lock_queue();
        let before = queue.len();
        queue.retain(|record| lock_record(record).message_id() != message_id);
        queue.len() != before
    }

    /// Drain every remaining record: the queue in FIFO order first, then any
    /// map entries not already seen (pre-handled but never handled).
    pub fn drain_all(&self) -> Vec<SharedRecord> {
        let mut queue = self.lock_queue();
        let mut map = self.lock_map();
        let mut drained: Vec<SharedRecord> = queue.drain(..).collect();
        let mut leftovers: Vec<SharedRecord> = map
            .drain()
            .map(|(_, record)| record)
            .filter(|record| !drained.iter().any(|seen| Arc::ptr_eq(seen, record)))
            .collect();
        // Map iteration order is arbitrary; keep the report order stable.
        leftovers.sort_by(|a, b| {
            let a = lock_record(a);
            let b = lock_record(b);
            a.message_id().cmp(b.message_id())
        });
        drained.extend(leftovers);
        drained
    }

    #[cfg(test)]
    pub fn queue_len(&self) -> usize {
        self.lock_queue().len()
    }

    fn lock_queue(&self) -> MutexGuard<'_, VecDeque<SharedRecord>> {
        self.queue.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, SharedRecord>> {
        self.map.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Leaf lock on a shared record.
pub fn lock_record(record: &SharedRecord) -> MutexGuard<'_, SpeakRecord> {
    record.lock().unwrap_or_else(|e| e.into_inner())
}
