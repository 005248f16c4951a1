//! Layered configuration for the terminal front end.

use std::path::{Path, PathBuf};

use exam_core::model::{SessionSettings, SessionSettingsDraft, UserId};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite connection URL.
    pub database_url: String,
    /// Identity the sessions are recorded under.
    pub user_id: String,
    pub autosave_period_secs: u32,
    pub resume_from_checkpoint: bool,
    pub record_mistakes: bool,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let draft = SessionSettingsDraft::default();
        Self {
            database_url: format!("sqlite://{}", data_dir.join("exam.sqlite3").display()),
            user_id: "local".into(),
            autosave_period_secs: draft.autosave_period_secs,
            resume_from_checkpoint: draft.resume_from_checkpoint,
            record_mistakes: draft.record_mistakes,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Sources, later ones winning: defaults, `config.toml` in the user config
    /// directory, `config_path`, `EXAM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `figment::Error` if a source cannot be parsed.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("EXAM_"));

        figment.extract()
    }

    /// Validated session settings.
    ///
    /// # Errors
    ///
    /// Returns `exam_core::Error::Settings` for an out-of-range autosave period.
    pub fn session_settings(&self) -> Result<SessionSettings, exam_core::Error> {
        let draft = SessionSettingsDraft {
            autosave_period_secs: self.autosave_period_secs,
            resume_from_checkpoint: self.resume_from_checkpoint,
            record_mistakes: self.record_mistakes,
        };
        Ok(draft.validate()?)
    }

    /// # Errors
    ///
    /// Returns `exam_core::Error::ParseId` for a blank user id.
    pub fn user(&self) -> Result<UserId, exam_core::Error> {
        Ok(self.user_id.parse()?)
    }
}

/// Returns the platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("exam-session"))
}

/// Returns the platform-specific data directory.
///
/// On Linux: `~/.local/share/exam-session`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("exam-session"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        assert!(config.database_url.ends_with("exam.sqlite3"));
        assert!(config.database_url.contains(&*data_dir.to_string_lossy()));
        assert_eq!(config.autosave_period_secs, 5);
    }

    #[test]
    fn file_and_env_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "exam.toml",
                r#"
                user_id = "ayse"
                autosave_period_secs = 10
                "#,
            )?;
            jail.set_env("EXAM_RECORD_MISTAKES", "false");

            let config = Config::load_from(Some(Path::new("exam.toml")))?;
            assert_eq!(config.user_id, "ayse");
            assert_eq!(config.autosave_period_secs, 10);
            assert!(!config.record_mistakes);
            assert!(config.resume_from_checkpoint);
            Ok(())
        });
    }

    #[test]
    fn invalid_autosave_period_is_rejected() {
        let config = Config {
            autosave_period_secs: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.session_settings(),
            Err(exam_core::Error::Settings(_))
        ));
    }

    #[test]
    fn blank_user_is_rejected() {
        let config = Config {
            user_id: "  ".into(),
            ..Config::default()
        };
        assert!(matches!(config.user(), Err(exam_core::Error::ParseId(_))));
    }
}
