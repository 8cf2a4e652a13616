use std::time::Duration;

use time::OffsetDateTime;
use url::Url;

use crate::client::IdentityApi;
use crate::config::ConsoleConfig;
use crate::error::Error;
use crate::store::{CredentialStore, Session};
use crate::token;

/// Consumer-provided full-page navigation.
///
/// Session failure escalates to a navigation away from the app, not an
/// in-app error state; the embedding shell decides what "navigate" means
/// (browser location assign, window open, process exit).
pub trait Navigator {
    fn assign(&self, url: &Url);
}

/// Lifecycle states of the current ID token.
///
/// `Valid -> Expired -> Refreshing -> Valid` on the happy path;
/// `Refreshing -> Failed` is terminal and triggers the login redirect.
/// There is no retry: a failed refresh is immediately fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    Expired,
    Refreshing,
    Failed,
}

/// Guarantees that authenticated calls run against a non-expired ID token.
///
/// One guard instance replaces the per-page expiry checks: pages call
/// [`guard`](SessionGuard::guard) on mount, before their own fetches.
pub struct SessionGuard<A, S> {
    api: A,
    store: S,
    login_url: Url,
    post_refresh_delay: Duration,
}

impl<A: IdentityApi, S: CredentialStore> SessionGuard<A, S> {
    #[must_use]
    pub fn new(api: A, store: S, config: &ConsoleConfig) -> Self {
        Self {
            api,
            store,
            login_url: config.login_url().clone(),
            post_refresh_delay: config.post_refresh_delay(),
        }
    }

    /// External login page targeted on unrecoverable failure.
    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Current lifecycle state of `id_token`, without any network call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenDecode`] for a malformed token.
    pub fn token_state(&self, id_token: &str) -> Result<TokenState, Error> {
        let claims = token::decode_claims(id_token)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Ok(if claims.is_expired(now) {
            TokenState::Expired
        } else {
            TokenState::Valid
        })
    }

    /// Resolve once `id_token` (or its refreshed replacement) is usable.
    ///
    /// A non-expired token resolves immediately with zero network calls,
    /// which is the path most calls take. An expired token triggers exactly one
    /// refresh; on success both tokens are persisted in a single store
    /// write, then the call suspends for the configured delay so the
    /// just-issued token's not-before can elapse against backend clock
    /// skew.
    ///
    /// Dropping the returned future aborts the in-flight refresh before
    /// the store write; an abandoned call never leaves a partial session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TokenDecode`] for a malformed token, or the
    /// refresh failure ([`Error::Http`] / [`Error::Api`]). Both are fatal
    /// for the current navigation; the store is left untouched.
    pub async fn ensure_fresh_token(&self, id_token: &str) -> Result<(), Error> {
        if self.token_state(id_token)? == TokenState::Valid {
            return Ok(());
        }
        tracing::debug!(state = ?TokenState::Refreshing, "id token expired, refreshing");

        let refreshed = match self.api.refresh().await {
            Ok(refreshed) => refreshed,
            Err(e) => {
                tracing::error!(error = %e, state = ?TokenState::Failed, "token refresh failed");
                return Err(e);
            }
        };

        // Single mutation point: both tokens land together or not at all.
        self.store.save(Session {
            id_token: refreshed.id_token,
            access_token: Some(refreshed.access_token),
        });

        tokio::time::sleep(self.post_refresh_delay).await;
        tracing::debug!(state = ?TokenState::Valid, "session refreshed");
        Ok(())
    }

    /// Page-mount gate: confirm a usable session or hand off to login.
    ///
    /// Reads the store, runs [`ensure_fresh_token`](Self::ensure_fresh_token),
    /// and on any failure (no session, malformed token, rejected refresh)
    /// clears the session and performs exactly one navigation to the login
    /// URL. Returns `true` when the caller may proceed with its own
    /// authenticated fetches.
    pub async fn guard<N: Navigator>(&self, navigator: &N) -> bool {
        let Some(session) = self.store.read() else {
            tracing::warn!("no stored session, redirecting to login");
            navigator.assign(&self.login_url);
            return false;
        };

        match self.ensure_fresh_token(&session.id_token).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "session unrecoverable, redirecting to login");
                self.store.clear();
                navigator.assign(&self.login_url);
                false
            }
        }
    }
}
