//! Cancelable deferred callbacks on a logical millisecond timeline.
//!
//! Actions are plain values handed back to the owner when their deadline
//! passes, so the owner applies them against its own state.

use std::collections::{BTreeMap, HashMap};

/// Logical time in milliseconds.
pub type Millis = u64;

/// Identifier of one scheduled callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

/// A set of actions waiting for their deadlines.
///
/// Due actions come out in ascending deadline order; actions sharing a
/// deadline come out in the order they were scheduled.
#[derive(Debug)]
pub struct Timeline<A> {
    /// Pending actions keyed by (deadline, sequence number).
    queue: BTreeMap<(Millis, u64), A>,
    /// Deadline of every pending handle, for cancellation.
    deadlines: HashMap<u64, Millis>,
    next_seq: u64,
}

impl<A> Default for Timeline<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Timeline<A> {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self {
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Schedules `action` to become due at `deadline`.
    pub fn schedule(&mut self, deadline: Millis, action: A) -> TimerHandle {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((deadline, seq), action);
        self.deadlines.insert(seq, deadline);
        TimerHandle(seq)
    }

    /// Cancels a pending callback.
    ///
    /// Returns false if the handle already fired or was cancelled.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.deadlines.remove(&handle.0) {
            Some(deadline) => self.queue.remove(&(deadline, handle.0)).is_some(),
            None => false,
        }
    }

    /// Removes and returns the earliest action whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<(TimerHandle, Millis, A)> {
        let (&(deadline, seq), _) = self.queue.first_key_value()?;
        if deadline > now {
            return None;
        }
        let action = self.queue.remove(&(deadline, seq))?;
        self.deadlines.remove(&seq);
        Some((TimerHandle(seq), deadline, action))
    }

    /// Deadline of the earliest pending action.
    pub fn next_deadline(&self) -> Option<Millis> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Number of pending actions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drops every pending action.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.deadlines.clear();
    }
}
