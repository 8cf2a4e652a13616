use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::Error;

/// Claims decoded from an ID token payload.
///
/// The client only decodes; it never verifies signature or issuer. The
/// single claim that gates navigation is `exp`; `email` is surfaced for
/// display (header userbox).
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct IdTokenClaims {
    /// Expiry, epoch seconds.
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
}

impl IdTokenClaims {
    /// Whether the token has expired at `now_unix` (epoch seconds).
    ///
    /// The token is valid iff `exp > now`; `exp == now` counts as expired.
    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.exp <= now_unix
    }
}

/// Decodes the payload segment of a compact ID token.
///
/// # Errors
///
/// Returns [`Error::TokenDecode`] if the token does not have three
/// dot-separated segments, the payload is not valid base64url, or the
/// decoded JSON is missing `exp`. Callers must treat this as fatal and
/// not keep using the token.
pub fn decode_claims(id_token: &str) -> Result<IdTokenClaims, Error> {
    let mut segments = id_token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(Error::TokenDecode("expected 3 dot-separated segments".into())),
    };

    // Payloads are unpadded base64url; tolerate issuers that pad anyway.
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Error::TokenDecode(format!("invalid base64url payload: {e}")))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| Error::TokenDecode(format!("invalid payload JSON: {e}")))
}
