use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, jwk::JwkSet};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{IdentityError, JwtVerifier, User, UserDirectory};

/// ClerkClient
///
/// Thin client for the Clerk Backend API. Every call authenticates with the
/// instance secret key and is bounded by the client-wide timeout.
#[derive(Clone)]
pub struct ClerkClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

/// Wire shape of `GET /users/{user_id}`. Only the fields the service reads.
#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    #[serde(default)]
    banned: bool,
    #[serde(default)]
    public_metadata: serde_json::Value,
}

impl From<ClerkUser> for User {
    fn from(user: ClerkUser) -> Self {
        let role = user
            .public_metadata
            .get("role")
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned);

        User {
            id: user.id,
            banned: user.banned,
            role,
        }
    }
}

impl ClerkClient {
    pub fn new(base_url: &str, secret_key: String, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IdentityError::Request)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    /// Fetches the instance's published signing keys.
    pub async fn fetch_jwks(&self) -> Result<JwkSet, IdentityError> {
        let response = self.get("/jwks").await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::Status(status.as_u16()));
        }
        response.json::<JwkSet>().await.map_err(classify)
    }

    /// Builds the session verifier from the JWKS as published right now.
    /// Key rotation on Clerk's side needs a restart to be picked up.
    pub async fn session_verifier(
        &self,
        authorized_parties: Vec<String>,
    ) -> Result<JwtVerifier, IdentityError> {
        let jwks = self.fetch_jwks().await?;
        tracing::info!(keys = jwks.keys.len(), "loaded identity provider signing keys");

        Ok(JwtVerifier::from_jwks(&jwks, Algorithm::RS256)?
            .with_authorized_parties(authorized_parties))
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, IdentityError> {
        self.http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(classify)
    }
}

#[async_trait]
impl UserDirectory for ClerkClient {
    async fn get_user(&self, user_id: &str) -> Result<User, IdentityError> {
        if !is_valid_user_id(user_id) {
            return Err(IdentityError::InvalidUserId(user_id.to_string()));
        }

        let response = self.get(&format!("/users/{user_id}")).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(IdentityError::UserNotFound(user_id.to_string())),
            status if !status.is_success() => Err(IdentityError::Status(status.as_u16())),
            _ => {
                let user = response.json::<ClerkUser>().await.map_err(classify)?;
                Ok(user.into())
            }
        }
    }
}

/// Clerk ids look like `user_2NNEqL2nrIRdJ194ndJqAHwEfxC`. Anything else is
/// refused before it can be spliced into a URL.
fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= 128
        && user_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn classify(err: reqwest::Error) -> IdentityError {
    if err.is_timeout() {
        IdentityError::Timeout
    } else {
        IdentityError::Request(err)
    }
}
