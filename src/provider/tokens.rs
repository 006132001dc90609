use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

/// A user's provider credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub username: Option<String>,
}

impl UserToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Per-user credential cache with expiry.
pub trait TokenStore: Send + Sync {
    fn get(&self, user_id: &str) -> Option<UserToken>;
    fn set(&self, user_id: &str, token: UserToken);
    /// True when the token has expired or there is no token at all.
    fn is_expired(&self, user_id: &str) -> bool;
}

/// Process-local store, for tests and single-user CLI runs.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<HashMap<String, UserToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UserToken>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for InMemoryTokenStore {
    fn get(&self, user_id: &str) -> Option<UserToken> {
        self.lock().get(user_id).cloned()
    }

    fn set(&self, user_id: &str, token: UserToken) {
        self.lock().insert(user_id.to_string(), token);
    }

    fn is_expired(&self, user_id: &str) -> bool {
        self.lock()
            .get(user_id)
            .is_none_or(|token| token.is_expired_at(Utc::now()))
    }
}
