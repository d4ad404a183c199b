use std::time::Instant;

use axum::{
    extract::{FromRequestParts, OriginalUri, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::{self, Next},
    response::Response,
};

use crate::{
    chain::Middleware,
    error::ApiError,
    identity::{DirectoryState, Principal, VerifierState},
};

/// Principal Extractor
///
/// Handlers take `Principal` as an argument instead of trusting that the
/// authentication middleware ran. If it is missing from the request
/// extensions (a route mounted without `authenticate`), the handler never
/// runs and the client gets `401 {"access":"unauthorized"}`.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

/// Verifies the bearer credential and attaches the [`Principal`].
///
/// Needs an `Authorization: Bearer <token>` header the verifier accepts;
/// anything else ends the request with 401.
pub fn authenticate(verifier: VerifierState) -> Middleware {
    Middleware::from_layer(
        "authenticate",
        middleware::from_fn_with_state(verifier, require_session),
    )
}

/// Lets the request through only for non-banned users with the admin role.
///
/// Must be chained after [`authenticate`]. The resolved `User` is attached to
/// the request so the handler does not have to fetch it again.
pub fn authorize_admin(directory: DirectoryState) -> Middleware {
    Middleware::from_layer(
        "authorize_admin",
        middleware::from_fn_with_state(directory, require_admin),
    )
}

/// Logs every request that reaches the group, with its outcome.
pub fn log_route() -> Middleware {
    Middleware::from_layer("log_route", middleware::from_fn(log_request))
}

async fn require_session(
    State(verifier): State<VerifierState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        tracing::debug!("request carries no bearer credential");
        return Err(ApiError::Unauthorized);
    };

    let principal = verifier.verify(&token).await.map_err(|e| {
        tracing::warn!(error = %e, "session verification failed");
        ApiError::Unauthorized
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

async fn require_admin(
    State(directory): State<DirectoryState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(ApiError::Unauthorized)?;

    let user = directory.get_user(&principal.subject).await?;
    if user.banned || !user.is_admin() {
        tracing::warn!(
            subject = %principal.subject,
            banned = user.banned,
            role = user.role.as_deref().unwrap_or("-"),
            "admin access denied"
        );
        return Err(ApiError::Forbidden);
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    // the group sees a stripped path; log the one the client sent
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| request.uri().path().to_owned());
    let subject = request
        .extensions()
        .get::<Principal>()
        .map(|p| p.subject.clone());
    let started = Instant::now();

    let response = next.run(request).await;

    tracing::info!(
        %method,
        path,
        subject = subject.as_deref().unwrap_or("-"),
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "route served"
    );
    response
}

/// Token from `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively; an empty token counts as absent.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
