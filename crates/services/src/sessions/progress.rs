use super::state::{SessionState, SessionStatus};

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
    pub current_index: usize,
    pub remaining_seconds: u32,
    pub status: SessionStatus,
}

impl SessionProgress {
    #[must_use]
    pub fn from_state(state: &SessionState) -> Self {
        let total = state.question_count();
        let answered = state.answers().len();
        Self {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            current_index: state.current_question_index(),
            remaining_seconds: state.remaining_seconds(),
            status: state.status(),
        }
    }

    /// Remaining time as `MM:SS`.
    #[must_use]
    pub fn clock(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Format seconds as zero-padded `MM:SS`. Minutes are not wrapped into hours.
#[must_use]
pub fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
