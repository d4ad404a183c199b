use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, Validation, decode, decode_header, errors::ErrorKind, jwk::JwkSet,
};
use serde::{Deserialize, Serialize};

use super::{AuthError, IdentityError, Principal, SessionVerifier};

/// SessionClaims
///
/// The subset of a Clerk session token's payload the service reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
    pub exp: u64,
}

/// JwtVerifier
///
/// Verifies session tokens locally against keys fixed at construction.
/// Keys published in a JWKS are selected by the token's `kid`; a single
/// shared secret is used for every token regardless of `kid`.
pub struct JwtVerifier {
    keys: HashMap<String, DecodingKey>,
    shared_key: Option<DecodingKey>,
    validation: Validation,
    authorized_parties: Vec<String>,
}

impl JwtVerifier {
    /// Builds a verifier from a published key set. Keys without a `kid`
    /// cannot be selected and are skipped.
    pub fn from_jwks(jwks: &JwkSet, algorithm: Algorithm) -> Result<Self, IdentityError> {
        let mut keys = HashMap::new();
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            let key = DecodingKey::from_jwk(jwk).map_err(IdentityError::InvalidKey)?;
            keys.insert(kid, key);
        }

        if keys.is_empty() {
            return Err(IdentityError::NoSigningKeys);
        }

        Ok(Self {
            keys,
            shared_key: None,
            validation: validation(algorithm),
            authorized_parties: Vec::new(),
        })
    }

    /// HS256 verifier for a shared secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            keys: HashMap::new(),
            shared_key: Some(DecodingKey::from_secret(secret)),
            validation: validation(Algorithm::HS256),
            authorized_parties: Vec::new(),
        }
    }

    /// Restricts accepted tokens to those whose `azp` is one of `parties`.
    /// An empty list disables the check.
    pub fn with_authorized_parties(mut self, parties: Vec<String>) -> Self {
        self.authorized_parties = parties;
        self
    }

    pub fn decode_claims(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let key = self.key_for(token)?;

        let data = decode::<SessionClaims>(token, key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::Invalid(e),
            }
        })?;
        let claims = data.claims;

        if !self.authorized_parties.is_empty() {
            let allowed = claims
                .azp
                .as_ref()
                .is_some_and(|azp| self.authorized_parties.contains(azp));
            if !allowed {
                return Err(AuthError::UnauthorizedParty);
            }
        }

        Ok(claims)
    }

    fn key_for(&self, token: &str) -> Result<&DecodingKey, AuthError> {
        if let Some(key) = &self.shared_key {
            return Ok(key);
        }

        let header = decode_header(token).map_err(AuthError::Malformed)?;
        header
            .kid
            .as_deref()
            .and_then(|kid| self.keys.get(kid))
            .ok_or(AuthError::UnknownKey)
    }
}

fn validation(algorithm: Algorithm) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation
}

#[async_trait]
impl SessionVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.decode_claims(token)?;
        Ok(Principal {
            subject: claims.sub,
            session_id: claims.sid,
            authorized_party: claims.azp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::{SystemTime, UNIX_EPOCH};

    const SECRET: &[u8] = b"jwks-test-signing-secret-01234567";
    // SECRET encoded as a JWKS `k` value; 33 bytes so no padding is needed
    const SECRET_B64: &str = "andrcy10ZXN0LXNpZ25pbmctc2VjcmV0LTAxMjM0NTY3";

    fn now() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
    }

    fn claims(exp: u64, azp: Option<&str>) -> SessionClaims {
        SessionClaims {
            sub: "user_2abc".to_string(),
            sid: Some("sess_1".to_string()),
            azp: azp.map(str::to_string),
            exp,
        }
    }

    fn sign(claims: &SessionClaims, kid: Option<&str>, secret: &[u8]) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_secret(secret)).unwrap()
    }

    fn jwks() -> JwkSet {
        serde_json::from_value(serde_json::json!({
            "keys": [
                { "kty": "oct", "kid": "key-1", "alg": "HS256", "k": SECRET_B64 },
                { "kty": "oct", "alg": "HS256", "k": SECRET_B64 }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let verifier = JwtVerifier::from_secret(SECRET);
        let token = sign(&claims(now() + 3600, None), None, SECRET);

        let principal = verifier.verify(&token).await.unwrap();

        assert_eq!(principal.subject, "user_2abc");
        assert_eq!(principal.session_id.as_deref(), Some("sess_1"));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let verifier = JwtVerifier::from_secret(SECRET);
        let token = sign(&claims(now() - 3600, None), None, SECRET);

        let result = verifier.verify(&token).await;

        assert!(matches!(result, Err(AuthError::Expired)));
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let verifier = JwtVerifier::from_secret(SECRET);
        let token = sign(&claims(now() + 3600, None), None, b"some-other-secret");

        assert!(matches!(verifier.verify(&token).await, Err(AuthError::Invalid(_))));
    }

    #[tokio::test]
    async fn rejects_garbage() {
        let verifier = JwtVerifier::from_jwks(&jwks(), Algorithm::HS256).unwrap();

        assert!(matches!(
            verifier.verify("not-a-jwt").await,
            Err(AuthError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn selects_jwks_key_by_kid() {
        let verifier = JwtVerifier::from_jwks(&jwks(), Algorithm::HS256).unwrap();
        let exp = now() + 3600;

        let known = sign(&claims(exp, None), Some("key-1"), SECRET);
        assert!(verifier.verify(&known).await.is_ok());

        let unknown = sign(&claims(exp, None), Some("key-2"), SECRET);
        assert!(matches!(verifier.verify(&unknown).await, Err(AuthError::UnknownKey)));

        let missing = sign(&claims(exp, None), None, SECRET);
        assert!(matches!(verifier.verify(&missing).await, Err(AuthError::UnknownKey)));
    }

    #[tokio::test]
    async fn rejects_token_signed_with_other_algorithm() {
        let verifier = JwtVerifier::from_jwks(&jwks(), Algorithm::RS256).unwrap();
        let token = sign(&claims(now() + 3600, None), Some("key-1"), SECRET);

        assert!(matches!(verifier.verify(&token).await, Err(AuthError::Invalid(_))));
    }

    #[test]
    fn empty_key_set_is_an_error() {
        let empty: JwkSet = serde_json::from_str(r#"{"keys":[]}"#).unwrap();

        let result = JwtVerifier::from_jwks(&empty, Algorithm::RS256);

        assert!(matches!(result, Err(IdentityError::NoSigningKeys)));
    }

    #[tokio::test]
    async fn enforces_authorized_parties() {
        let verifier = JwtVerifier::from_secret(SECRET)
            .with_authorized_parties(vec!["https://app.example.com".to_string()]);
        let exp = now() + 3600;

        let allowed = sign(&claims(exp, Some("https://app.example.com")), None, SECRET);
        let principal = verifier.verify(&allowed).await.unwrap();
        assert_eq!(
            principal.authorized_party.as_deref(),
            Some("https://app.example.com")
        );

        let foreign = sign(&claims(exp, Some("https://evil.example.com")), None, SECRET);
        assert!(matches!(
            verifier.verify(&foreign).await,
            Err(AuthError::UnauthorizedParty)
        ));

        let absent = sign(&claims(exp, None), None, SECRET);
        assert!(matches!(
            verifier.verify(&absent).await,
            Err(AuthError::UnauthorizedParty)
        ));
    }
}
