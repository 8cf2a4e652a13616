use std::collections::HashMap;

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// SaaSus tenant identifier (opaque string).
///
/// Returned in identity snapshots and carried as the `tenant_id` query
/// parameter on role-routed pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Into)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Permission tier resolved from a role assignment's `role_name`.
///
/// Anything the API reports that is not `sadmin` or `admin` is a plain
/// member; unknown names never fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SuperAdmin,
    Admin,
    Member,
}

impl Role {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "sadmin" => Self::SuperAdmin,
            "admin" => Self::Admin,
            _ => Self::Member,
        }
    }
}

/// Role assignment within a tenant environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct RoleGrant {
    pub role_name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Tenant environment with its role assignments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Environment {
    #[serde(default)]
    pub envs_id: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
}

/// Tenant membership from the identity snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    #[serde(default)]
    pub envs: Vec<Environment>,
    #[serde(default)]
    pub plan_id: Option<String>,
}

impl Tenant {
    /// Role of the first assignment in the first environment.
    ///
    /// Total over any snapshot shape: an empty `envs` or `roles` list is
    /// "no role", not a panic.
    #[must_use]
    pub fn primary_role(&self) -> Option<Role> {
        self.envs
            .first()
            .and_then(|env| env.roles.first())
            .map(|grant| Role::from_name(&grant.role_name))
    }
}

/// Identity snapshot from the userinfo endpoint.
///
/// Not persisted; re-fetched per navigation decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    pub email: String,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

/// Token pair from the refresh endpoint.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct RefreshResponse {
    pub id_token: String,
    pub access_token: String,
}

/// Token material from the authorization-code exchange.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct CredentialsResponse {
    pub id_token: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

/// MFA enablement state for the current user.
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct MfaStatus {
    pub enabled: bool,
}

/// MFA enrollment material (authenticator QR code URL).
#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct MfaSetup {
    #[serde(rename = "qrCodeUrl")]
    pub qr_code_url: String,
}

/// Pending invitation to join a tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct Invitation {
    pub id: String,
    pub email: String,
    pub invitation_url: String,
    pub status: String,
    /// Expiry, epoch seconds.
    #[serde(default)]
    pub expired_at: Option<i64>,
    #[serde(default)]
    pub envs: Vec<Environment>,
}

/// Self-signup submission: tenant name plus the attribute values collected
/// through the schemas from the attribute fan-out.
///
/// Serialized with the camelCase keys the signup endpoint expects.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub tenant_name: String,
    pub user_attribute_values: HashMap<String, serde_json::Value>,
    pub tenant_attribute_values: HashMap<String, serde_json::Value>,
}

/// Declared user attribute (self-signup form schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct UserAttribute {
    pub attribute_name: String,
    pub display_name: String,
    pub attribute_type: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct UserAttributesResponse {
    #[serde(default)]
    pub user_attributes: HashMap<String, UserAttribute>,
}

/// Declared tenant attribute (self-signup form schema).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TenantAttribute {
    pub attribute_name: String,
    pub display_name: String,
    pub attribute_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[non_exhaustive]
pub struct TenantAttributesResponse {
    #[serde(default)]
    pub tenant_attributes: HashMap<String, TenantAttribute>,
}
