use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use tokio::net::TcpListener;

use crate::{
    AppState, create_router,
    config::AppConfig,
    error::StartupError,
    identity::ClerkClient,
    secrets::{SecretKind, SecretState},
};

/// Application
///
/// Owns the process configuration and the secret provider. Resolves secrets,
/// builds the identity clients and the route table exactly once, then serves
/// until a shutdown signal arrives.
pub struct Application {
    config: AppConfig,
    secrets: SecretState,
}

impl Application {
    pub fn new(config: AppConfig, secrets: SecretState) -> Self {
        Self { config, secrets }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Resolves the identity provider key and loads its signing keys.
    ///
    /// Nothing is bound yet when this fails.
    pub async fn build_state(&self) -> Result<AppState, StartupError> {
        let secret_key = self.secrets.get_secret(SecretKind::IdentityProviderKey)?;

        let clerk = ClerkClient::new(
            &self.config.identity_api_url,
            secret_key,
            self.config.upstream_timeout(),
        )?;
        let verifier = clerk
            .session_verifier(self.config.authorized_parties.clone())
            .await?;

        Ok(AppState {
            config: self.config.clone(),
            verifier: Arc::new(verifier),
            directory: Arc::new(clerk),
        })
    }

    /// Builds everything, binds `0.0.0.0:<port>` and serves until Ctrl+C or
    /// SIGTERM. Returns after in-flight requests have finished.
    pub async fn serve(self) -> Result<(), StartupError> {
        let state = self.build_state().await?;
        let router = create_router(state)?;

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| StartupError::Bind { addr, source })?;

        tracing::info!(%addr, env = %self.config.env, "HTTP server listening");

        run(listener, router).await
    }
}

async fn run(listener: TcpListener, router: Router) -> Result<(), StartupError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
