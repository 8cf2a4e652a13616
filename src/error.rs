use crate::types::TenantId;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or undecodable ID token. Fatal: the caller must not keep
    /// using the token (re-login is the only recovery).
    #[error("token decode error: {0}")]
    TokenDecode(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success response from the SaaSus API.
    #[error("API error during {operation} (status {status:?}): {detail}")]
    Api {
        operation: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// Requested tenant is not in the caller's membership list.
    #[error("no membership in tenant {0}")]
    TenantAccess(TenantId),

    #[error("configuration error: {0}")]
    Config(String),
}
