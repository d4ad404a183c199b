use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use settings_api::{AppConfig, Application, Env, secrets::EnvSecretProvider};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Parses flags, sets up logging, then hands over to `Application`. Any
/// startup failure is logged and turns into exit code 1.
#[tokio::main]
async fn main() -> ExitCode {
    // 1. Configuration. A local .env may provide CLERK_SECRET_KEY.
    dotenv::dotenv().ok();
    let config = AppConfig::parse();

    // 2. Logging. RUST_LOG wins over the defaults.
    init_tracing(config.env);
    tracing::info!("Application starting in {} mode", config.env);

    // 3. Build and serve. Secrets are read from the process environment.
    let app = Application::new(config, Arc::new(EnvSecretProvider));
    match app.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "fatal error, shutting down");
            ExitCode::FAILURE
        }
    }
}

/// Pretty output while developing, JSON for log aggregation everywhere else.
fn init_tracing(env: Env) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "settings_api=debug,tower_http=info".into());

    match env {
        Env::Development => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Staging | Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }
}
