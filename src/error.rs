use std::{any::Any, io, net::SocketAddr};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{group::RouteError, identity::IdentityError, secrets::SecretError};

/// ApiError
///
/// Every failure a request can end in. Converted to a status code and a small
/// JSON body at the boundary; internal detail only ever reaches the logs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("identity provider call failed: {0}")]
    Upstream(#[from] IdentityError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Upstream(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Unauthorized => json!({ "access": "unauthorized" }),
            ApiError::Forbidden => json!({ "access": "forbidden" }),
            ApiError::NotFound => json!({ "error": "the requested resource could not be found" }),
            ApiError::Upstream(e) => {
                tracing::error!(error = %e, "identity provider call failed");
                json!({ "error": "the identity provider could not be reached" })
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Response for a handler that panicked. The panic payload is logged, never sent.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    tracing::error!(panic = %detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "internal server error" })),
    )
        .into_response()
}

/// StartupError
///
/// Anything that stops the service from coming up. Fatal: the process logs it
/// and exits non-zero without serving.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Secret(#[from] SecretError),
    #[error("identity provider setup failed: {0}")]
    Identity(#[from] IdentityError),
    #[error("invalid route table: {0}")]
    Route(#[from] RouteError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
