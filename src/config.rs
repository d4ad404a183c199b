use std::{fmt, time::Duration};

use clap::{Parser, ValueEnum};

/// AppConfig
///
/// Process configuration, parsed once from command-line flags at startup and
/// immutable afterwards. Shared with handlers through `AppState`.
#[derive(Clone, Debug, Parser)]
#[command(name = "settings-api", about = "Role-gated settings API backed by Clerk")]
pub struct AppConfig {
    /// API server port.
    #[arg(long, default_value_t = 4000)]
    pub port: u16,

    /// Runtime environment. Controls the log format.
    #[arg(long, value_enum, default_value_t = Env::Development)]
    pub env: Env,

    /// Base URL of the Clerk Backend API.
    #[arg(long, default_value = "https://api.clerk.com/v1")]
    pub identity_api_url: String,

    /// Upper bound for a single call to the identity provider, in seconds.
    #[arg(long, default_value_t = 5)]
    pub upstream_timeout_secs: u64,

    /// Accepted values for the session token's `azp` claim. Repeatable.
    /// When none are given the claim is not checked.
    #[arg(long = "authorized-party")]
    pub authorized_parties: Vec<String>,
}

/// Env
///
/// The deployment environment the process runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Env {
    Development,
    Staging,
    Production,
}

impl Env {
    pub fn as_str(self) -> &'static str {
        match self {
            Env::Development => "development",
            Env::Staging => "staging",
            Env::Production => "production",
        }
    }
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AppConfig {
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

impl Default for AppConfig {
    /// Same values the flag parser falls back to; handy for test state.
    fn default() -> Self {
        Self {
            port: 4000,
            env: Env::Development,
            identity_api_url: "https://api.clerk.com/v1".to_string(),
            upstream_timeout_secs: 5,
            authorized_parties: Vec::new(),
        }
    }
}
