use exam_core::model::TICK_PERIOD;
use exam_core::scheduler::{Scheduler, SchedulerError, TimerToken};

/// Countdown state machine: `Idle -> Running -> {Expired | Stopped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Expired,
    Stopped,
}

/// Result of one countdown firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining: u32,
    /// Set on the firing that reached zero, and only on that one.
    pub expired: bool,
}

/// Drives the one-second countdown on a [`Scheduler`].
#[derive(Debug)]
pub struct TimerController {
    state: TimerState,
    token: Option<TimerToken>,
}

impl Default for TimerController {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            token: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Whether this timer is the owner of a scheduler firing.
    #[must_use]
    pub fn owns(&self, token: TimerToken) -> bool {
        self.token == Some(token)
    }

    /// Start ticking once per second. Does nothing unless the timer is idle.
    ///
    /// Starting with nothing left expires the timer immediately without scheduling.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError` if the scheduler refuses the timer.
    pub fn start(&mut self, scheduler: &mut Scheduler, remaining: u32) -> Result<(), SchedulerError> {
        if self.state != TimerState::Idle {
            return Ok(());
        }
        if remaining == 0 {
            self.state = TimerState::Expired;
            return Ok(());
        }
        self.token = Some(scheduler.schedule_repeating(TICK_PERIOD)?);
        self.state = TimerState::Running;
        Ok(())
    }

    /// Handle a firing of `token`, decrementing `remaining` by one.
    ///
    /// Returns `None` for tokens this timer does not own or when it is no longer
    /// running.
    pub fn on_fire(
        &mut self,
        scheduler: &mut Scheduler,
        token: TimerToken,
        remaining: &mut u32,
    ) -> Option<Tick> {
        if self.state != TimerState::Running || !self.owns(token) {
            return None;
        }

        *remaining = remaining.saturating_sub(1);
        let expired = *remaining == 0;
        if expired {
            self.state = TimerState::Expired;
            self.cancel(scheduler);
        }
        Some(Tick {
            remaining: *remaining,
            expired,
        })
    }

    /// Stop the countdown. Only a running timer changes state.
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        if self.state == TimerState::Running {
            self.state = TimerState::Stopped;
        }
        self.cancel(scheduler);
    }

    fn cancel(&mut self, scheduler: &mut Scheduler) {
        if let Some(token) = self.token.take() {
            scheduler.cancel(token);
        }
    }
}
