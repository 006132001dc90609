pub mod spotify;
pub mod tokens;

use thiserror::Error;

use crate::models::ArtistProfile;
use tokens::{TokenStore, UserToken};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Missing, expired or unrefreshable credential. Caller must re-authenticate.
    #[error("not authenticated: {0}")]
    Auth(String),
    /// The provider failed. The detail is for logs, not for end users.
    #[error("upstream provider error: {0}")]
    Upstream(String),
}

impl ProviderError {
    /// Message safe to show an end user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Auth(_) => "User not authenticated",
            Self::Upstream(_) => "Failed to fetch artists from the streaming provider",
        }
    }
}

/// Where the user's artists come from.
pub trait ArtistSource {
    fn top_artists(&self, user_id: &str) -> Result<Vec<ArtistProfile>, ProviderError>;

    /// Artists from the user's saved tracks, deduplicated.
    fn liked_artists(&self, user_id: &str) -> Result<Vec<ArtistProfile>, ProviderError>;
}

/// Exchanges a token's refresh credential for a new access token.
pub trait TokenRefresher {
    fn refresh(&self, token: &UserToken) -> Result<UserToken, ProviderError>;
}

/// Refresher for sessions that cannot refresh (e.g. a pasted access token).
pub struct NoRefresh;

impl TokenRefresher for NoRefresh {
    fn refresh(&self, _token: &UserToken) -> Result<UserToken, ProviderError> {
        Err(ProviderError::Auth("token expired and refresh is not available".into()))
    }
}

/// Outcome of one authenticated call.
#[derive(Debug)]
pub enum CallError {
    /// The provider rejected the access token (HTTP 401).
    Unauthorized,
    Failed(ProviderError),
}

fn refresh_and_store<S, R>(store: &S, refresher: &R, user_id: &str, token: &UserToken) -> Result<UserToken, ProviderError>
where
    S: TokenStore + ?Sized,
    R: TokenRefresher + ?Sized,
{
    let fresh = refresher.refresh(token)?;
    store.set(user_id, fresh.clone());
    log::debug!("Refreshed token for {user_id}");
    Ok(fresh)
}

/// Run `request` with the user's access token, refreshing at most once.
///
/// An expired token is refreshed up front. A 401 from a request made with a
/// token that was not just refreshed triggers one refresh and one retry; any
/// further 401 is an [`ProviderError::Auth`].
pub fn with_refresh_retry<T, S, R, F>(store: &S, refresher: &R, user_id: &str, mut request: F) -> Result<T, ProviderError>
where
    S: TokenStore + ?Sized,
    R: TokenRefresher + ?Sized,
    F: FnMut(&str) -> Result<T, CallError>,
{
    let mut token = store
        .get(user_id)
        .ok_or_else(|| ProviderError::Auth(format!("no token for user {user_id}")))?;

    let mut refreshed = false;
    if store.is_expired(user_id) {
        token = refresh_and_store(store, refresher, user_id, &token)?;
        refreshed = true;
    }

    match request(&token.access_token) {
        Ok(value) => return Ok(value),
        Err(CallError::Failed(e)) => return Err(e),
        Err(CallError::Unauthorized) if refreshed => {
            return Err(ProviderError::Auth("refreshed token was rejected".into()));
        }
        Err(CallError::Unauthorized) => {
            log::info!("Access token for {user_id} rejected, refreshing once");
        }
    }

    let token = refresh_and_store(store, refresher, user_id, &token)?;
    match request(&token.access_token) {
        Ok(value) => Ok(value),
        Err(CallError::Failed(e)) => Err(e),
        Err(CallError::Unauthorized) => Err(ProviderError::Auth("refreshed token was rejected".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::cell::Cell;
    use super::tokens::InMemoryTokenStore;

    fn token(access: &str, expires_in: Duration) -> UserToken {
        UserToken {
            access_token: access.into(),
            refresh_token: Some("r".into()),
            expires_at: Utc::now() + expires_in,
            username: None,
        }
    }

    struct CountingRefresher {
        calls: Cell<usize>,
    }

    impl TokenRefresher for CountingRefresher {
        fn refresh(&self, _token: &UserToken) -> Result<UserToken, ProviderError> {
            self.calls.set(self.calls.get() + 1);
            Ok(token(&format!("fresh-{}", self.calls.get()), Duration::hours(1)))
        }
    }

    fn refresher() -> CountingRefresher {
        CountingRefresher { calls: Cell::new(0) }
    }

    #[test]
    fn test_no_token_is_auth_error() {
        let store = InMemoryTokenStore::new();
        let result: Result<(), _> = with_refresh_retry(&store, &NoRefresh, "u", |_| Ok(()));
        assert!(matches!(result, Err(ProviderError::Auth(_))));
    }

    #[test]
    fn test_valid_token_used_directly() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("good", Duration::hours(1)));
        let r = refresher();
        let seen = with_refresh_retry(&store, &r, "u", |t| Ok(t.to_string())).unwrap();
        assert_eq!(seen, "good");
        assert_eq!(r.calls.get(), 0);
    }

    #[test]
    fn test_expired_token_refreshed_first() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("old", -Duration::minutes(5)));
        let r = refresher();
        let seen = with_refresh_retry(&store, &r, "u", |t| Ok(t.to_string())).unwrap();
        assert_eq!(seen, "fresh-1");
        assert_eq!(store.get("u").unwrap().access_token, "fresh-1");
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn test_unauthorized_retried_once() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("revoked", Duration::hours(1)));
        let r = refresher();
        let attempts = Cell::new(0);
        let seen = with_refresh_retry(&store, &r, "u", |t| {
            attempts.set(attempts.get() + 1);
            if t == "revoked" { Err(CallError::Unauthorized) } else { Ok(t.to_string()) }
        })
        .unwrap();
        assert_eq!(seen, "fresh-1");
        assert_eq!(attempts.get(), 2);
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn test_persistent_unauthorized_is_bounded() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("revoked", Duration::hours(1)));
        let r = refresher();
        let attempts = Cell::new(0);
        let result: Result<(), _> = with_refresh_retry(&store, &r, "u", |_| {
            attempts.set(attempts.get() + 1);
            Err(CallError::Unauthorized)
        });
        assert!(matches!(result, Err(ProviderError::Auth(_))));
        assert_eq!(attempts.get(), 2);
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn test_no_second_refresh_after_expiry_refresh() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("old", -Duration::minutes(1)));
        let r = refresher();
        let result: Result<(), _> = with_refresh_retry(&store, &r, "u", |_| Err(CallError::Unauthorized));
        assert!(matches!(result, Err(ProviderError::Auth(_))));
        assert_eq!(r.calls.get(), 1);
    }

    #[test]
    fn test_upstream_error_not_retried() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("good", Duration::hours(1)));
        let r = refresher();
        let result: Result<(), _> = with_refresh_retry(&store, &r, "u", |_| {
            Err(CallError::Failed(ProviderError::Upstream("503".into())))
        });
        assert_eq!(result, Err(ProviderError::Upstream("503".into())));
        assert_eq!(r.calls.get(), 0);
    }

    #[test]
    fn test_no_refresh_surfaces_auth() {
        let store = InMemoryTokenStore::new();
        store.set("u", token("old", -Duration::minutes(1)));
        let result: Result<(), _> = with_refresh_retry(&store, &NoRefresh, "u", |_| Ok(()));
        assert!(matches!(result, Err(ProviderError::Auth(_))));
        assert_eq!(
            ProviderError::Upstream("boom".into()).user_message(),
            "Failed to fetch artists from the streaming provider"
        );
    }
}
