use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchedulerError {
    #[error("repeating timers need a non-zero period")]
    ZeroPeriod,
}

//
// ─── TOKENS ────────────────────────────────────────────────────────────────────
//

/// Cancellation handle for a scheduled timer.
///
/// Tokens are handed out in increasing order, so comparing two tokens tells which
/// timer was scheduled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(u64);

/// A timer that became due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firing {
    pub token: TimerToken,
    /// Virtual time at which the timer was due.
    pub at: Duration,
}

#[derive(Debug, Clone)]
struct Entry {
    period: Duration,
    next_due: Duration,
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Virtual-time scheduler for repeating timers.
///
/// Time only moves when the owner drains due firings with [`Scheduler::pop_due`]
/// and settles with [`Scheduler::advance_to`]. Firings come out in chronological
/// order; timers due at the same instant fire in the order they were scheduled.
/// A cancelled timer never fires again, even if it was already due.
///
/// ```
/// # use std::time::Duration;
/// # use exam_core::scheduler::Scheduler;
/// let mut scheduler = Scheduler::new();
/// let token = scheduler.schedule_repeating(Duration::from_secs(1)).unwrap();
///
/// let deadline = Duration::from_secs(2);
/// let mut fired = 0;
/// while let Some(firing) = scheduler.pop_due(deadline) {
///     assert_eq!(firing.token, token);
///     fired += 1;
/// }
/// scheduler.advance_to(deadline);
/// assert_eq!(fired, 2);
/// ```
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_token: u64,
    timers: BTreeMap<TimerToken, Entry>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time since the scheduler was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule a timer that fires every `period`, first at `now + period`.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::ZeroPeriod` for a zero period.
    pub fn schedule_repeating(&mut self, period: Duration) -> Result<TimerToken, SchedulerError> {
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        self.timers.insert(
            token,
            Entry {
                period,
                next_due: self.now + period,
            },
        );
        Ok(token)
    }

    /// Cancel a timer. Returns `false` if it was not scheduled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        self.timers.remove(&token).is_some()
    }

    /// Number of live timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Pop the earliest firing due at or before `deadline`.
    ///
    /// Moves the clock to the firing's due time and re-arms the timer for its next
    /// period.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<Firing> {
        let (token, entry) = self
            .timers
            .iter_mut()
            .filter(|(_, entry)| entry.next_due <= deadline)
            .min_by_key(|(token, entry)| (entry.next_due, **token))?;

        let at = entry.next_due;
        entry.next_due += entry.period;
        self.now = self.now.max(at);
        Some(Firing { token: *token, at })
    }

    /// Move the clock forward to `deadline` once every due firing has been drained.
    pub fn advance_to(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }

    /// Drop every timer.
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn drain(scheduler: &mut Scheduler, deadline: Duration) -> Vec<Firing> {
        let mut out = Vec::new();
        while let Some(f) = scheduler.pop_due(deadline) {
            out.push(f);
        }
        scheduler.advance_to(deadline);
        out
    }

    #[test]
    fn zero_period_is_rejected() {
        let mut scheduler = Scheduler::new();
        assert_eq!(
            scheduler.schedule_repeating(Duration::ZERO),
            Err(SchedulerError::ZeroPeriod)
        );
    }

    #[test]
    fn firings_are_chronological_with_ties_in_schedule_order() {
        let mut scheduler = Scheduler::new();
        let tick = scheduler.schedule_repeating(secs(1)).unwrap();
        let save = scheduler.schedule_repeating(secs(2)).unwrap();

        let fired: Vec<_> = drain(&mut scheduler, secs(4))
            .into_iter()
            .map(|f| (f.token, f.at.as_secs()))
            .collect();

        assert_eq!(
            fired,
            vec![
                (tick, 1),
                (tick, 2),
                (save, 2),
                (tick, 3),
                (tick, 4),
                (save, 4),
            ]
        );
        assert_eq!(scheduler.now(), secs(4));
    }

    #[test]
    fn cancelled_timer_stops_firing_even_when_due() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule_repeating(secs(1)).unwrap();
        let b = scheduler.schedule_repeating(secs(1)).unwrap();

        let first = scheduler.pop_due(secs(3)).unwrap();
        assert_eq!(first.token, a);
        assert!(scheduler.cancel(b));

        let rest = drain(&mut scheduler, secs(3));
        assert!(rest.iter().all(|f| f.token == a));
        assert_eq!(rest.len(), 2);
        assert!(!scheduler.cancel(b));
    }

    #[test]
    fn advancing_in_small_steps_matches_one_big_step() {
        let mut stepped = Scheduler::new();
        stepped.schedule_repeating(secs(5)).unwrap();
        let mut count = 0;
        for step in 1..=12 {
            count += drain(&mut stepped, secs(step)).len();
        }

        let mut jumped = Scheduler::new();
        jumped.schedule_repeating(secs(5)).unwrap();
        assert_eq!(count, drain(&mut jumped, secs(12)).len());
        assert_eq!(count, 2);
    }

    #[test]
    fn timers_scheduled_later_start_from_current_time() {
        let mut scheduler = Scheduler::new();
        scheduler.advance_to(secs(10));
        let token = scheduler.schedule_repeating(secs(3)).unwrap();
        assert!(scheduler.pop_due(secs(12)).is_none());
        let firing = scheduler.pop_due(secs(13)).unwrap();
        assert_eq!((firing.token, firing.at), (token, secs(13)));
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule_repeating(secs(1)).unwrap();
        scheduler.schedule_repeating(secs(5)).unwrap();
        scheduler.cancel_all();
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.pop_due(secs(100)).is_none());
    }
}
