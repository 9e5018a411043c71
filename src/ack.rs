//! Acknowledgement correlator: one id counter and one id → continuation
//! table per connection.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::handler::BoxedAckHandler;

/// Correlates outgoing event ids with their acknowledgement continuations.
///
/// The counter and the table are guarded by two separate locks, taken
/// sequentially and never nested, so emitters reserving ids do not contend
/// with the loop resolving inbound acknowledgements.
pub(crate) struct AckRegistry {
    counter: Mutex<i64>,
    pending: Mutex<HashMap<i64, BoxedAckHandler>>,
}

impl AckRegistry {
    pub(crate) fn new() -> Self {
        Self {
            counter: Mutex::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Reserve the next correlation id.
    ///
    /// Wraps to zero at `i64::MAX` and skips ids that still have a pending
    /// continuation, so a wrapped counter cannot collide with an
    /// outstanding entry.
    pub(crate) fn reserve(&self) -> i64 {
        loop {
            let id = {
                let mut counter = self.counter.lock().unwrap();
                let id = *counter;
                *counter = if id == i64::MAX { 0 } else { id + 1 };
                id
            };
            if !self.pending.lock().unwrap().contains_key(&id) {
                return id;
            }
        }
    }

    pub(crate) fn insert(&self, id: i64, handler: BoxedAckHandler) {
        self.pending.lock().unwrap().insert(id, handler);
    }

    /// Take the continuation for `id`, if any. Taking it is what guarantees
    /// at-most-once invocation.
    pub(crate) fn remove(&self, id: i64) -> Option<BoxedAckHandler> {
        self.pending.lock().unwrap().remove(&id)
    }

    /// Drop every outstanding continuation and return how many were
    /// abandoned. Called once on connection teardown.
    pub(crate) fn clear(&self) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let abandoned = pending.len();
        pending.clear();
        abandoned
    }

    #[cfg(test)]
    pub(crate) fn set_counter(&self, value: i64) {
        *self.counter.lock().unwrap() = value;
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, id: i64) -> bool {
        self.pending.lock().unwrap().contains_key(&id)
    }
}
