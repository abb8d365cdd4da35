use crate::view::render::Element;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer is for, and whose it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKey {
    PollRetry,
    Visibility,
    PauseHide,
    CrossfadeFinalize,
    ScrollStart(Element),
    EdgeMask(Element),
}

/// Virtual-time timer queue. Time only moves when the owner pops due timers,
/// so every callback runs to completion before the next one fires.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: Duration,
    next_id: u64,
    pending: BTreeMap<(Duration, TimerId), TimerKey>,
    deadlines: HashMap<TimerId, Duration>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, key: TimerKey, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.now + delay;
        self.pending.insert((deadline, id), key);
        self.deadlines.insert(id, deadline);
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.pending.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes the earliest timer due at or before `until` and moves the clock
    /// to its deadline. Timers with equal deadlines fire in scheduling order.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, TimerKey)> {
        let (&(deadline, id), _) = self.pending.iter().next()?;
        if deadline > until {
            return None;
        }
        let key = self.pending.remove(&(deadline, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some((id, key))
    }

    pub fn advance_clock(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &TimerKey> {
        self.pending.values()
    }
}

/// The single current handle for one timer role. Scheduling always
/// supersedes the previous handle.
#[derive(Debug, Default)]
pub struct TimerSlot(Option<TimerId>);

impl TimerSlot {
    pub fn schedule(&mut self, timers: &mut TimerQueue, key: TimerKey, delay: Duration) {
        self.cancel(timers);
        self.0 = Some(timers.schedule(key, delay));
    }

    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        if let Some(id) = self.0.take() {
            timers.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.0.is_some()
    }

    /// Accepts a firing timer; returns false for a handle this slot no longer owns.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.0 == Some(id) {
            self.0 = None;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_deadline_then_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(TimerKey::Visibility, Duration::from_millis(500));
        timers.schedule(TimerKey::PollRetry, Duration::from_millis(100));
        timers.schedule(TimerKey::PauseHide, Duration::from_millis(100));

        let until = Duration::from_millis(1000);
        assert_eq!(timers.pop_due(until).map(|(_, k)| k), Some(TimerKey::PollRetry));
        assert_eq!(timers.now(), Duration::from_millis(100));
        assert_eq!(timers.pop_due(until).map(|(_, k)| k), Some(TimerKey::PauseHide));
        assert_eq!(timers.pop_due(until).map(|(_, k)| k), Some(TimerKey::Visibility));
        assert_eq!(timers.pop_due(until), None);
    }

    #[test]
    fn nothing_fires_before_its_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule(TimerKey::PollRetry, Duration::from_millis(5000));
        assert_eq!(timers.pop_due(Duration::from_millis(4999)), None);
        assert!(timers.pop_due(Duration::from_millis(5000)).is_some());
    }

    #[test]
    fn slot_reschedule_supersedes_previous_handle() {
        let mut timers = TimerQueue::new();
        let mut slot = TimerSlot::default();
        slot.schedule(&mut timers, TimerKey::PauseHide, Duration::from_millis(10));
        slot.schedule(&mut timers, TimerKey::PauseHide, Duration::from_millis(20));
        assert_eq!(timers.len(), 1);

        let (id, _) = timers.pop_due(Duration::from_secs(1)).unwrap();
        assert_eq!(timers.now(), Duration::from_millis(20));
        assert!(slot.fire(id));
        assert!(!slot.is_pending());
        assert!(!slot.fire(id));
    }

    #[test]
    fn cancel_removes_pending_timer() {
        let mut timers = TimerQueue::new();
        let mut slot = TimerSlot::default();
        slot.schedule(&mut timers, TimerKey::Visibility, Duration::from_millis(10));
        slot.cancel(&mut timers);
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
