//! Identity provider seams.
//!
//! Session verification and user lookup are external capabilities. Handlers
//! and middleware only ever see the two traits below; the Clerk-backed
//! implementations live in [`clerk`] and [`jwt`], the in-memory one in [`mock`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

pub mod clerk;
pub mod jwt;
pub mod mock;

pub use clerk::ClerkClient;
pub use jwt::{JwtVerifier, SessionClaims};
pub use mock::MockIdentityProvider;

/// Role value (in the user's public metadata) that grants admin access.
pub const ADMIN_ROLE: &str = "admin";

/// Principal
///
/// The verified identity behind a request. Attached to the request
/// extensions by the authentication middleware and dropped with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Subject (`sub`): the identity provider's user id.
    pub subject: String,
    /// Session id (`sid`), when the token carries one.
    pub session_id: Option<String>,
    /// Authorized party (`azp`): the origin the token was minted for.
    pub authorized_party: Option<String>,
}

impl Principal {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            session_id: None,
            authorized_party: None,
        }
    }
}

/// User
///
/// The attributes the service needs from the identity provider's user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct User {
    pub id: String,
    pub banned: bool,
    /// Taken from `public_metadata.role`. Absent for ordinary users.
    pub role: Option<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session token is malformed: {0}")]
    Malformed(#[source] jsonwebtoken::errors::Error),
    #[error("session token was signed with an unknown key")]
    UnknownKey,
    #[error("session token has expired")]
    Expired,
    #[error("session token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
    #[error("session token was issued for an unauthorized party")]
    UnauthorizedParty,
    #[error("session token was rejected")]
    Rejected,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("identity provider request timed out")]
    Timeout,
    #[error("identity provider request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("identity provider answered with status {0}")]
    Status(u16),
    #[error("user `{0}` does not exist")]
    UserNotFound(String),
    #[error("`{0}` is not a valid user id")]
    InvalidUserId(String),
    #[error("identity provider published an unusable signing key: {0}")]
    InvalidKey(#[source] jsonwebtoken::errors::Error),
    #[error("identity provider published no signing keys")]
    NoSigningKeys,
    #[error("identity provider is unavailable")]
    Unavailable,
}

impl IdentityError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, IdentityError::Timeout)
    }
}

/// SessionVerifier
///
/// Verifies a bearer credential and returns the principal it was issued to.
#[async_trait]
pub trait SessionVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError>;
}

/// UserDirectory
///
/// Resolves a subject id to the identity provider's user record.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<User, IdentityError>;
}

pub type VerifierState = Arc<dyn SessionVerifier>;
pub type DirectoryState = Arc<dyn UserDirectory>;
