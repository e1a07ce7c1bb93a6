use std::env;

use serde::{Deserialize, Serialize};

use crate::board::capacity::DEFAULT_FOCUS_CAPACITY;
use crate::board::store::UserResolver;
use crate::board::{ColumnRole, UserId};

/// Environment variable that overrides every other user source.
pub const USER_ENV: &str = "FOCUSBOARD_USER";

/// `.focusboard/config.toml`
#[derive(Debug, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardSection,
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BoardSection {
    pub name: String,
    pub next_card_id: u32,
    #[serde(default = "default_focus_capacity")]
    pub focus_capacity: usize,
    /// When the board was created (ISO-8601 string).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_focus_capacity() -> usize {
    DEFAULT_FOCUS_CAPACITY
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    pub title: String,
    pub order: i64,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ColumnRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// `.focusboard/local.toml`: per-user settings, never committed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Resolves the current user from `FOCUSBOARD_USER`, then `local.toml`,
/// then the login name in `USER` / `USERNAME`.
#[derive(Debug, Clone, Default)]
pub struct LocalUser {
    pub local: LocalConfig,
}

impl LocalUser {
    pub fn new(local: LocalConfig) -> Self {
        Self { local }
    }

    fn resolve(&self, var: impl Fn(&str) -> Option<String>) -> Option<UserId> {
        let non_empty = |s: String| {
            let s = s.trim().to_string();
            (!s.is_empty()).then_some(s)
        };
        var(USER_ENV)
            .and_then(non_empty)
            .or_else(|| self.local.user.clone().and_then(non_empty))
            .or_else(|| var("USER").and_then(non_empty))
            .or_else(|| var("USERNAME").and_then(non_empty))
            .map(UserId::new)
    }
}

impl UserResolver for LocalUser {
    fn current_user(&self) -> Option<UserId> {
        self.resolve(|name| env::var(name).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn env_override_wins() {
        let users = LocalUser::new(LocalConfig { user: Some("local".into()) });
        let got = users.resolve(vars(&[(USER_ENV, "env"), ("USER", "login")]));
        assert_eq!(got, Some(UserId::from("env")));
    }

    #[test]
    fn local_config_beats_login_name() {
        let users = LocalUser::new(LocalConfig { user: Some("local".into()) });
        assert_eq!(users.resolve(vars(&[("USER", "login")])), Some(UserId::from("local")));
    }

    #[test]
    fn blank_values_fall_through() {
        let users = LocalUser::new(LocalConfig { user: Some("  ".into()) });
        assert_eq!(
            users.resolve(vars(&[(USER_ENV, ""), ("USERNAME", "win")])),
            Some(UserId::from("win"))
        );
        assert_eq!(LocalUser::default().resolve(vars(&[])), None);
    }

    #[test]
    fn focus_capacity_defaults_to_five() {
        let cfg: BoardConfig = toml::from_str("[board]\nname = \"b\"\nnext_card_id = 1\n").unwrap();
        assert_eq!(cfg.board.focus_capacity, 5);
        assert!(cfg.columns.is_empty());
    }
}
