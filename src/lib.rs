#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod guard;
pub mod router;
pub mod store;
pub mod token;
pub mod types;

// Re-exports for convenient access
pub use client::{ApiClient, IdentityApi};
pub use config::ConsoleConfig;
pub use error::Error;
pub use guard::{Navigator, SessionGuard, TokenState};
pub use router::{RoleRouter, Route};
pub use store::{CredentialStore, MemoryStore, Session};
pub use token::{IdTokenClaims, decode_claims};
pub use types::{Invitation, Role, SignUpForm, Tenant, TenantId, UserInfo};
