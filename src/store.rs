use std::sync::{Arc, Mutex, PoisonError};

/// Client-side authentication state.
///
/// The refresh token is deliberately absent: it lives in the transport's
/// cookie jar, set by server responses and never read back by crate code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id_token: String,
    /// Secondary credential required by privileged endpoints (MFA
    /// management, user invitation).
    pub access_token: Option<String>,
}

/// Consumer-provided credential persistence.
///
/// The single source of truth for "is there a session". Writes are
/// last-write-wins; `read` never errors. Multi-tab/multi-process access is
/// an unguarded hazard the trait does not attempt to solve.
///
/// # Example
///
/// ```rust,ignore
/// impl CredentialStore for BrowserStorage {
///     fn save(&self, session: Session) {
///         self.set("SaaSusIdToken", &session.id_token);
///         match &session.access_token {
///             Some(t) => self.set("SaaSusAccessToken", t),
///             None => self.remove("SaaSusAccessToken"),
///         }
///     }
///     // ...
/// }
/// ```
pub trait CredentialStore: Send + Sync + 'static {
    /// Overwrite the stored session unconditionally.
    fn save(&self, session: Session);

    /// Current session, or `None` when no ID token is present.
    fn read(&self) -> Option<Session>;

    /// Remove all credentials (logout). Idempotent.
    fn clear(&self);
}

impl<T: CredentialStore> CredentialStore for Arc<T> {
    fn save(&self, session: Session) {
        (**self).save(session);
    }

    fn read(&self) -> Option<Session> {
        (**self).read()
    }

    fn clear(&self) {
        (**self).clear();
    }
}

/// In-process [`CredentialStore`] for single-shell use and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    session: Mutex<Option<Session>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CredentialStore for MemoryStore {
    fn save(&self, session: Session) {
        *self.lock() = Some(session);
    }

    fn read(&self) -> Option<Session> {
        self.lock().clone()
    }

    fn clear(&self) {
        *self.lock() = None;
    }
}
