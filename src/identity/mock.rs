use std::{
    collections::HashMap,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use super::{AuthError, IdentityError, Principal, SessionVerifier, User, UserDirectory};

/// MockIdentityProvider
///
/// In-memory stand-in for Clerk, implementing both identity seams. Tokens
/// map straight to principals; users are looked up from a fixed table.
/// Used by the integration tests and for local experiments.
#[derive(Default)]
pub struct MockIdentityProvider {
    sessions: HashMap<String, Principal>,
    users: HashMap<String, User>,
    failure: Option<MockFailure>,
    lookups: AtomicUsize,
}

#[derive(Debug, Clone, Copy)]
enum MockFailure {
    Unavailable,
    Timeout,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `token` as a session for `subject`.
    pub fn with_session(mut self, token: &str, subject: &str) -> Self {
        self.sessions
            .insert(token.to_string(), Principal::new(subject));
        self
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }

    /// Every user lookup fails as if the upstream were down.
    pub fn failing(mut self) -> Self {
        self.failure = Some(MockFailure::Unavailable);
        self
    }

    /// Every user lookup fails as if the upstream timed out.
    pub fn timing_out(mut self) -> Self {
        self.failure = Some(MockFailure::Timeout);
        self
    }

    /// Number of user lookups served so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionVerifier for MockIdentityProvider {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        self.sessions.get(token).cloned().ok_or(AuthError::Rejected)
    }
}

#[async_trait]
impl UserDirectory for MockIdentityProvider {
    async fn get_user(&self, user_id: &str) -> Result<User, IdentityError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        match self.failure {
            Some(MockFailure::Unavailable) => return Err(IdentityError::Unavailable),
            Some(MockFailure::Timeout) => return Err(IdentityError::Timeout),
            None => {}
        }

        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| IdentityError::UserNotFound(user_id.to_string()))
    }
}
