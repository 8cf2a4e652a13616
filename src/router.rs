use std::fmt;

use crate::client::IdentityApi;
use crate::error::Error;
use crate::types::{Role, Tenant, TenantId, UserInfo};

/// Top-level destination after a session is confirmed valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// User belongs to no tenant yet.
    SelfSignUp,
    /// User belongs to several tenants; let them pick.
    TenantSelection,
    SuperAdminTop(TenantId),
    AdminTop(TenantId),
    /// Least-privileged default; also the safe fallback when routing cannot
    /// be resolved. The tenant is carried when known.
    UserTop(Option<TenantId>),
}

impl Route {
    /// In-app path, with the resolved tenant as a query parameter.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::SelfSignUp => "/self_sign_up".to_owned(),
            Self::TenantSelection => "/tenants".to_owned(),
            Self::SuperAdminTop(id) => toppage("/sadmin/toppage", Some(id)),
            Self::AdminTop(id) => toppage("/admin/toppage", Some(id)),
            Self::UserTop(id) => toppage("/user/toppage", id.as_ref()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

fn toppage(base: &str, tenant_id: Option<&TenantId>) -> String {
    match tenant_id {
        Some(id) => format!("{base}?tenant_id={}", urlencoding::encode(id.as_str())),
        None => base.to_owned(),
    }
}

/// Decides which top-level page to present once a valid session exists.
///
/// Routing never fails: any error in resolution degrades to the standard
/// user page rather than stranding the user.
pub struct RoleRouter<A> {
    api: A,
}

impl<A: IdentityApi> RoleRouter<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Resolve the destination for the current user.
    ///
    /// Without `tenant_id` (post-login): zero memberships go to self-signup,
    /// several to the tenant picker, exactly one straight to role-based
    /// routing. With `tenant_id` (in-app navigation): the membership must
    /// exist; a tenant the user does not belong to is an authorization
    /// mismatch and falls back to the plain default route with no tenant
    /// query at all. The unverified id must not leak into the destination,
    /// so the mismatch branch drops it while transient fetch failures keep
    /// the id the user was already navigating with.
    pub async fn resolve_destination(
        &self,
        id_token: &str,
        tenant_id: Option<&TenantId>,
    ) -> Route {
        match self.try_resolve(id_token, tenant_id).await {
            Ok(route) => route,
            Err(e @ Error::TenantAccess(_)) => {
                tracing::warn!(error = %e, "tenant not in membership set, falling back to user toppage");
                Route::UserTop(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "routing unresolved, falling back to user toppage");
                Route::UserTop(tenant_id.cloned())
            }
        }
    }

    async fn try_resolve(
        &self,
        id_token: &str,
        tenant_id: Option<&TenantId>,
    ) -> Result<Route, Error> {
        let info: UserInfo = self.api.userinfo(id_token).await?;

        let tenant = match tenant_id {
            None => match info.tenants.as_slice() {
                [] => return Ok(Route::SelfSignUp),
                [only] => only,
                _ => return Ok(Route::TenantSelection),
            },
            Some(wanted) => info
                .tenants
                .iter()
                .find(|t| &t.id == wanted)
                .ok_or_else(|| Error::TenantAccess(wanted.clone()))?,
        };

        Ok(route_by_role(tenant))
    }
}

/// Role-based routing for a resolved membership. Total: a tenant with no
/// role lands on the standard page.
fn route_by_role(tenant: &Tenant) -> Route {
    match tenant.primary_role() {
        Some(Role::SuperAdmin) => Route::SuperAdminTop(tenant.id.clone()),
        Some(Role::Admin) => Route::AdminTop(tenant.id.clone()),
        Some(Role::Member) | None => Route::UserTop(Some(tenant.id.clone())),
    }
}
