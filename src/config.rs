use std::time::Duration;

use url::Url;

use crate::error::Error;

/// Default suspension after a refresh before the new token is used.
///
/// A just-issued token can be rejected by the backend verifier as "used
/// before issued" when clocks are skewed.
const DEFAULT_POST_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Console configuration: API endpoint, external login URL, and guard
/// tunables.
///
/// Required fields are constructor parameters, so there are no runtime
/// "missing field" errors.
///
/// ```rust,ignore
/// use saasus_console::ConsoleConfig;
///
/// let config = ConsoleConfig::new(
///     "https://api.example.com/v1".parse()?,
///     "https://auth.example.com/login".parse()?,
/// );
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ConsoleConfig {
    pub(crate) api_endpoint: Url,
    pub(crate) login_url: Url,
    pub(crate) post_refresh_delay: Duration,
}

impl ConsoleConfig {
    /// Create a configuration with the required endpoints.
    #[must_use]
    pub fn new(api_endpoint: Url, login_url: Url) -> Self {
        Self {
            api_endpoint,
            login_url,
            post_refresh_delay: DEFAULT_POST_REFRESH_DELAY,
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// # Required env vars
    /// - `SAASUS_API_ENDPOINT`: base URL of the identity/billing API
    /// - `SAASUS_LOGIN_URL`: external login page for session-failure redirects
    ///
    /// # Optional env vars
    /// - `SAASUS_REFRESH_DELAY_MS`: post-refresh suspension in milliseconds
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, Error> {
        let api_endpoint = require_url("SAASUS_API_ENDPOINT")?;
        let login_url = require_url("SAASUS_LOGIN_URL")?;
        let mut config = Self::new(api_endpoint, login_url);

        if let Ok(ms) = std::env::var("SAASUS_REFRESH_DELAY_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|e| Error::Config(format!("SAASUS_REFRESH_DELAY_MS: {e}")))?;
            config = config.with_post_refresh_delay(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Override the post-refresh suspension.
    #[must_use]
    pub fn with_post_refresh_delay(mut self, delay: Duration) -> Self {
        self.post_refresh_delay = delay;
        self
    }

    /// Base URL of the identity/billing API.
    #[must_use]
    pub fn api_endpoint(&self) -> &Url {
        &self.api_endpoint
    }

    /// External login page targeted on unrecoverable session failure.
    #[must_use]
    pub fn login_url(&self) -> &Url {
        &self.login_url
    }

    /// Suspension after a successful refresh before the token is used.
    #[must_use]
    pub fn post_refresh_delay(&self) -> Duration {
        self.post_refresh_delay
    }
}

fn require_url(var: &str) -> Result<Url, Error> {
    let value =
        std::env::var(var).map_err(|_| Error::Config(format!("{var} is required")))?;
    value
        .parse()
        .map_err(|e| Error::Config(format!("{var}: {e}")))
}
