// Request-scoped session context handed to the reconciler.

use serde::{Deserialize, Serialize};

/// What the caller remembers about the user's selection for this request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    /// The league the user picked.
    pub league_key: String,
    /// The team name the user picked alongside the league. Yahoo's login flag
    /// is sometimes missing on the user's own team, so this name is matched as
    /// a second identity signal.
    #[serde(default)]
    pub remembered_team_name: Option<String>,
}

impl SessionContext {
    pub fn new(league_key: impl Into<String>) -> Self {
        SessionContext {
            league_key: league_key.into(),
            remembered_team_name: None,
        }
    }

    pub fn with_team_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        let trimmed = name.trim();
        self.remembered_team_name = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Lowercased remembered team name, if one is set.
    pub fn team_name_key(&self) -> Option<String> {
        self.remembered_team_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_lowercase)
    }
}
