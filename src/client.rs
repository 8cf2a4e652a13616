use std::future::Future;

use serde_json::json;

use crate::config::ConsoleConfig;
use crate::error::Error;
use crate::types::{
    CredentialsResponse, Invitation, MfaSetup, MfaStatus, RefreshResponse, SignUpForm,
    TenantAttributesResponse, TenantId, UserAttributesResponse, UserInfo,
};

/// Diagnostic header naming the calling operation. Telemetry only; it
/// carries no authorization semantics.
const REFERER_HEADER: &str = "X-SaaSus-Referer";

/// Secondary credential header for privileged endpoints.
const ACCESS_TOKEN_HEADER: &str = "X-Access-Token";

/// Transport seam used by the guard and the router.
///
/// [`ApiClient`] is the production implementation; tests substitute
/// call-counting fakes.
pub trait IdentityApi: Send + Sync {
    /// Exchange the refresh cookie for a new token pair.
    fn refresh(&self) -> impl Future<Output = Result<RefreshResponse, Error>> + Send;

    /// Fetch the identity snapshot for the bearer of `id_token`.
    fn userinfo(&self, id_token: &str) -> impl Future<Output = Result<UserInfo, Error>> + Send;
}

/// HTTP client for the SaaSus identity/billing API.
///
/// Carries a cookie store: the refresh token is set by server responses and
/// attached automatically on credentialed calls; crate code never reads it.
/// Cheap to clone (the underlying pool is shared).
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoint: url::Url,
}

impl ApiClient {
    /// Create a client against the configured API endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the underlying TLS backend fails to
    /// initialize.
    pub fn new(config: &ConsoleConfig) -> Result<Self, Error> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            endpoint: config.api_endpoint().clone(),
        })
    }

    /// Use a custom HTTP client (for pool reuse or testing).
    ///
    /// The client must have a cookie store enabled, or refresh calls will
    /// go out without the refresh cookie.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.endpoint.as_str().trim_end_matches('/'))
    }

    fn get(&self, path: &str, operation: &'static str) -> reqwest::RequestBuilder {
        self.http
            .get(self.url(path))
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER_HEADER, operation)
    }

    fn post(&self, path: &str, operation: &'static str) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(path))
            .header("X-Requested-With", "XMLHttpRequest")
            .header(REFERER_HEADER, operation)
    }

    /// Exchange an authorization code for tokens (login callback).
    ///
    /// The response also sets the refresh cookie in the client's jar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// endpoint rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<CredentialsResponse, Error> {
        let response = self
            .get("credentials", "Callback")
            .query(&[("code", code)])
            .send()
            .await?;
        let response = Self::ensure_success(response, "credentials").await?;
        response.json().await.map_err(Into::into)
    }

    /// Exchange the refresh cookie for a new ID/access token pair.
    ///
    /// No credential is sent explicitly; the cookie jar attaches the
    /// refresh cookie.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// refresh endpoint rejects the cookie.
    pub async fn refresh(&self) -> Result<RefreshResponse, Error> {
        let response = self.get("refresh", "TokenRefresh").send().await?;
        let response = Self::ensure_success(response, "refresh").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch the identity snapshot for the bearer of `id_token`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn userinfo(&self, id_token: &str) -> Result<UserInfo, Error> {
        let response = self
            .get("userinfo", "GetUserInfo")
            .bearer_auth(id_token)
            .send()
            .await?;
        let response = Self::ensure_success(response, "userinfo").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch the self-signup form schemas: user attributes and tenant
    /// attributes, concurrently.
    ///
    /// The two fetches are independent; completion order is not guaranteed
    /// and carries no meaning.
    ///
    /// # Errors
    ///
    /// Returns the first failure from either fetch.
    pub async fn signup_attributes(
        &self,
        id_token: &str,
    ) -> Result<(UserAttributesResponse, TenantAttributesResponse), Error> {
        let users = async {
            let response = self
                .get("user_attributes", "GetUserAttributes")
                .bearer_auth(id_token)
                .send()
                .await?;
            let response = Self::ensure_success(response, "user_attributes").await?;
            response.json::<UserAttributesResponse>().await.map_err(Error::from)
        };
        let tenants = async {
            let response = self
                .get("tenant_attributes_list", "GetTenantAttributes")
                .bearer_auth(id_token)
                .send()
                .await?;
            let response = Self::ensure_success(response, "tenant_attributes_list").await?;
            response.json::<TenantAttributesResponse>().await.map_err(Error::from)
        };
        tokio::try_join!(users, tenants)
    }

    /// Fetch MFA enablement state for the current user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status (404 when the backend has no MFA support).
    pub async fn mfa_status(&self, id_token: &str) -> Result<MfaStatus, Error> {
        let response = self
            .get("mfa_status", "CheckMfaStatus")
            .bearer_auth(id_token)
            .send()
            .await?;
        let response = Self::ensure_success(response, "mfa_status").await?;
        response.json().await.map_err(Into::into)
    }

    /// Fetch MFA enrollment material. Requires the access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn mfa_setup(
        &self,
        id_token: &str,
        access_token: &str,
    ) -> Result<MfaSetup, Error> {
        let response = self
            .get("mfa_setup", "FetchMfaSetup")
            .bearer_auth(id_token)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .send()
            .await?;
        let response = Self::ensure_success(response, "mfa_setup").await?;
        response.json().await.map_err(Into::into)
    }

    /// Verify an authenticator code to complete MFA enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// code is rejected.
    pub async fn mfa_verify(
        &self,
        id_token: &str,
        access_token: &str,
        verification_code: &str,
    ) -> Result<(), Error> {
        let response = self
            .post("mfa_verify", "VerifyMfa")
            .bearer_auth(id_token)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .json(&json!({ "verification_code": verification_code }))
            .send()
            .await?;
        Self::ensure_success(response, "mfa_verify").await?;
        Ok(())
    }

    /// List pending invitations for a tenant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] on a
    /// non-success status.
    pub async fn invitations(
        &self,
        id_token: &str,
        tenant_id: &TenantId,
    ) -> Result<Vec<Invitation>, Error> {
        let response = self
            .get("invitations", "GetInvitations")
            .bearer_auth(id_token)
            .query(&[("tenant_id", tenant_id.as_str())])
            .send()
            .await?;
        let response = Self::ensure_success(response, "invitations").await?;
        response.json().await.map_err(Into::into)
    }

    /// Invite a user to a tenant by email. Requires the access token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// invitation is rejected.
    pub async fn invite_user(
        &self,
        id_token: &str,
        access_token: &str,
        email: &str,
        tenant_id: &TenantId,
    ) -> Result<(), Error> {
        let response = self
            .post("user_invitation", "InviteUser")
            .bearer_auth(id_token)
            .header(ACCESS_TOKEN_HEADER, access_token)
            .json(&json!({ "email": email, "tenantId": tenant_id.as_str() }))
            .send()
            .await?;
        Self::ensure_success(response, "user_invitation").await?;
        Ok(())
    }

    /// Submit the self-signup form, creating the user's first tenant.
    ///
    /// On success the caller should refetch [`ApiClient::userinfo`] and
    /// re-route: the snapshot now carries the new tenant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] on network failure, or [`Error::Api`] if the
    /// submission is rejected.
    pub async fn self_sign_up(&self, id_token: &str, form: &SignUpForm) -> Result<(), Error> {
        let response = self
            .post("self_sign_up", "SubmitSelfSignUp")
            .bearer_auth(id_token)
            .json(form)
            .send()
            .await?;
        Self::ensure_success(response, "self_sign_up").await?;
        Ok(())
    }

    /// Checks HTTP response status; returns the response on success or an
    /// error with the body captured.
    async fn ensure_success(
        response: reqwest::Response,
        operation: &'static str,
    ) -> Result<reqwest::Response, Error> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(Error::Api {
            operation,
            status: Some(status),
            detail,
        })
    }
}

impl IdentityApi for ApiClient {
    fn refresh(&self) -> impl Future<Output = Result<RefreshResponse, Error>> + Send {
        ApiClient::refresh(self)
    }

    fn userinfo(&self, id_token: &str) -> impl Future<Output = Result<UserInfo, Error>> + Send {
        ApiClient::userinfo(self, id_token)
    }
}
