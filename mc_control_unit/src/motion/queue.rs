//! Bounded priority queue of motion requests.
//!
//! Higher priority first; FIFO within a priority. Only requests that have not
//! been handed to the planner live here, so the queue never preempts motion.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};

use mc_common::control_unit::error::SubmitError;
use mc_common::control_unit::motion::{MotionRequest, Priority, RequestId};

type QueueKey = (Reverse<Priority>, u64);

#[derive(Debug)]
pub struct MotionQueue {
    entries: BTreeMap<QueueKey, MotionRequest>,
    index: HashMap<RequestId, QueueKey>,
    capacity: usize,
    next_seq: u64,
}

impl MotionQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            index: HashMap::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Add a request behind every queued request of equal or higher priority.
    ///
    /// # Errors
    /// `SubmitError::QueueFull` when `capacity` requests are already queued.
    pub fn enqueue(&mut self, request: MotionRequest) -> Result<RequestId, SubmitError> {
        if self.entries.len() >= self.capacity {
            return Err(SubmitError::QueueFull {
                capacity: self.capacity,
            });
        }
        let id = request.id;
        let key = (Reverse(request.priority), self.next_seq);
        self.next_seq += 1;
        self.index.insert(id, key);
        self.entries.insert(key, request);
        Ok(id)
    }

    /// Remove a queued request. Returns `None` if it is not queued.
    pub fn remove(&mut self, id: RequestId) -> Option<MotionRequest> {
        let key = self.index.remove(&id)?;
        self.entries.remove(&key)
    }

    /// Drop a queued request. Returns false if `id` is not queued.
    pub fn cancel(&mut self, id: RequestId) -> bool {
        self.remove(id).is_some()
    }

    /// Take the highest-priority, oldest request.
    pub fn dequeue_next(&mut self) -> Option<MotionRequest> {
        let (_, request) = self.entries.pop_first()?;
        self.index.remove(&request.id);
        Some(request)
    }

    #[inline]
    pub fn contains(&self, id: RequestId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Queued ids in service order.
    pub fn ids(&self) -> impl Iterator<Item = RequestId> + '_ {
        self.entries.values().map(|r| r.id)
    }
}
