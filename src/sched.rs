//! # Scheduled Tasks
//!
//! Cancellable deferred work for the single-threaded engine. Instead of
//! fire-and-forget timers, every deferral is an entry in a `TaskQueue` keyed
//! by the resource it targets, so a superseding request cancels the stale one
//! deterministically. The owner pumps the queue from its per-frame update
//! with its own accumulated wall clock; nothing fires between frames.

/// A keyed, cancellable queue of deferred tasks.
///
/// Tasks fire in `(due, insertion order)` order. `schedule` does not replace
/// same-keyed entries by itself; callers cancel the key first when the new
/// work supersedes the old (a fade is many entries under one key).
pub struct TaskQueue<K, T> {
    entries: Vec<Entry<K, T>>,
    seq: u64,
}

struct Entry<K, T> {
    key: K,
    due: f64,
    seq: u64,
    task: T,
}

impl<K: Copy + PartialEq, T> TaskQueue<K, T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            seq: 0,
        }
    }

    /// Schedules `task` under `key` to fire once `now >= due`.
    pub fn schedule(&mut self, key: K, due: f64, task: T) {
        let seq = self.seq;
        self.seq += 1;
        self.entries.push(Entry {
            key,
            due,
            seq,
            task,
        });
    }

    /// Cancels every pending entry under `key`.
    pub fn cancel(&mut self, key: K) {
        self.entries.retain(|e| e.key != key);
    }

    /// Cancels everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns the next task due at `now`, earliest first.
    ///
    /// Call in a loop to drain; a fired task may schedule follow-ups, which
    /// are picked up in the same drain if already due.
    pub fn pop_due(&mut self, now: f64) -> Option<T> {
        let idx = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.due <= now)
            .min_by(|(_, a), (_, b)| {
                a.due
                    .partial_cmp(&b.due)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.seq.cmp(&b.seq))
            })
            .map(|(i, _)| i)?;
        Some(self.entries.remove(idx).task)
    }

    pub fn has_pending(&self, key: K) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Copy + PartialEq, T> Default for TaskQueue<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
