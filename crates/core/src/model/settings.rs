use std::time::Duration;
use thiserror::Error;

/// Granularity of the exam countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

const DEFAULT_AUTOSAVE_PERIOD_SECS: u32 = 5;
const MAX_AUTOSAVE_PERIOD_SECS: u32 = 3_600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("autosave period must be between 1 and {MAX_AUTOSAVE_PERIOD_SECS} seconds (got {0})")]
    InvalidAutosavePeriod(u32),
}

/// Tunables for an exam session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionSettings {
    autosave_period_secs: u32,
    resume_from_checkpoint: bool,
    record_mistakes: bool,
}

/// Unvalidated settings as they come out of configuration files.
#[derive(Clone, Debug)]
pub struct SessionSettingsDraft {
    pub autosave_period_secs: u32,
    pub resume_from_checkpoint: bool,
    pub record_mistakes: bool,
}

impl Default for SessionSettingsDraft {
    fn default() -> Self {
        Self {
            autosave_period_secs: DEFAULT_AUTOSAVE_PERIOD_SECS,
            resume_from_checkpoint: true,
            record_mistakes: true,
        }
    }
}

impl SessionSettingsDraft {
    /// Validate the draft into usable settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidAutosavePeriod` if the period is zero or longer
    /// than an hour.
    pub fn validate(self) -> Result<SessionSettings, SettingsError> {
        if !(1..=MAX_AUTOSAVE_PERIOD_SECS).contains(&self.autosave_period_secs) {
            return Err(SettingsError::InvalidAutosavePeriod(
                self.autosave_period_secs,
            ));
        }

        Ok(SessionSettings {
            autosave_period_secs: self.autosave_period_secs,
            resume_from_checkpoint: self.resume_from_checkpoint,
            record_mistakes: self.record_mistakes,
        })
    }
}

impl SessionSettings {
    #[must_use]
    pub fn autosave_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.autosave_period_secs))
    }

    #[must_use]
    pub fn resume_from_checkpoint(&self) -> bool {
        self.resume_from_checkpoint
    }

    #[must_use]
    pub fn record_mistakes(&self) -> bool {
        self.record_mistakes
    }

    #[must_use]
    pub fn with_resume_from_checkpoint(mut self, enabled: bool) -> Self {
        self.resume_from_checkpoint = enabled;
        self
    }

    #[must_use]
    pub fn with_record_mistakes(mut self, enabled: bool) -> Self {
        self.record_mistakes = enabled;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            autosave_period_secs: DEFAULT_AUTOSAVE_PERIOD_SECS,
            resume_from_checkpoint: true,
            record_mistakes: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_draft_matches_default_settings() {
        let settings = SessionSettingsDraft::default().validate().unwrap();
        assert_eq!(settings, SessionSettings::default());
        assert_eq!(settings.autosave_period(), Duration::from_secs(5));
    }

    #[test]
    fn zero_autosave_period_is_rejected() {
        let draft = SessionSettingsDraft {
            autosave_period_secs: 0,
            ..SessionSettingsDraft::default()
        };
        assert_eq!(
            draft.validate().unwrap_err(),
            SettingsError::InvalidAutosavePeriod(0)
        );
    }
}
