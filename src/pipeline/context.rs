use chrono::{DateTime, Utc};

use crate::AuthProfile;

/// Immutable run-scoped inputs shared by every stage
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub base_url: String,
    pub started_at: DateTime<Utc>,
    pub auth: AuthProfile,
    /// Token from the single login at run start
    pub token: Option<String>,
}

impl RunContext {
    pub fn new(base_url: impl Into<String>, auth: AuthProfile, token: Option<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            base_url: base_url.into(),
            started_at: Utc::now(),
            auth,
            token,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
