use std::{env, sync::Arc};

/// SecretKind
///
/// Identifies a secret the service needs at startup. Each kind is bound to
/// exactly one environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// Clerk Backend API secret key. Used to fetch the JWKS and to look up users.
    IdentityProviderKey,
}

impl SecretKind {
    /// The environment variable the secret is read from.
    pub const fn env_var(self) -> &'static str {
        match self {
            SecretKind::IdentityProviderKey => "CLERK_SECRET_KEY",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretError {
    #[error("secret not found: {0}")]
    NotFound(&'static str),
}

/// SecretProvider
///
/// Capability for resolving secrets. The service only ever uses the
/// environment-backed implementation; tests inject their own.
pub trait SecretProvider: Send + Sync {
    fn get_secret(&self, kind: SecretKind) -> Result<String, SecretError>;
}

/// SecretState
///
/// Shared handle to the configured secret provider.
pub type SecretState = Arc<dyn SecretProvider>;

/// EnvSecretProvider
///
/// Reads secrets straight from the process environment on every call.
/// Unset and empty variables are both treated as missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretProvider;

impl SecretProvider for EnvSecretProvider {
    fn get_secret(&self, kind: SecretKind) -> Result<String, SecretError> {
        let var = kind.env_var();
        match env::var(var) {
            Ok(value) if !value.is_empty() => Ok(value),
            _ => Err(SecretError::NotFound(var)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VAR: &str = "CLERK_SECRET_KEY";

    fn with_var<R>(value: Option<&str>, test: impl FnOnce() -> R) -> R {
        let original = env::var(VAR).ok();
        unsafe {
            match value {
                Some(v) => env::set_var(VAR, v),
                None => env::remove_var(VAR),
            }
        }
        let result = test();
        unsafe {
            match original {
                Some(v) => env::set_var(VAR, v),
                None => env::remove_var(VAR),
            }
        }
        result
    }

    #[test]
    #[serial]
    fn reads_secret_from_environment() {
        let secret = with_var(Some("sk_test_123"), || {
            EnvSecretProvider.get_secret(SecretKind::IdentityProviderKey)
        });
        assert_eq!(secret, Ok("sk_test_123".to_string()));
    }

    #[test]
    #[serial]
    fn missing_secret_names_the_variable() {
        let err = with_var(None, || {
            EnvSecretProvider.get_secret(SecretKind::IdentityProviderKey)
        })
        .unwrap_err();
        assert_eq!(err, SecretError::NotFound("CLERK_SECRET_KEY"));
        assert_eq!(err.to_string(), "secret not found: CLERK_SECRET_KEY");
    }

    #[test]
    #[serial]
    fn empty_secret_is_missing() {
        let result = with_var(Some(""), || {
            EnvSecretProvider.get_secret(SecretKind::IdentityProviderKey)
        });
        assert!(result.is_err());
    }
}
