use axum::{Extension, Json, extract::State};

use crate::{
    config::AppConfig,
    error::ApiError,
    identity::{DirectoryState, Principal, User},
    models::{HealthResponse, SettingsResponse},
};

/// user_settings
///
/// [User Route] `GET /api/settings`. Returns the caller's id and banned flag,
/// fetched fresh from the identity provider.
pub async fn user_settings(
    principal: Principal,
    State(directory): State<DirectoryState>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let user = directory.get_user(&principal.subject).await?;
    Ok(Json(user.into()))
}

/// admin_settings
///
/// [Admin Route] `GET /admin/settings`. Same body as the user route. Reuses
/// the user record the admin check already resolved when it belongs to the
/// caller; otherwise looks it up.
pub async fn admin_settings(
    principal: Principal,
    resolved: Option<Extension<User>>,
    State(directory): State<DirectoryState>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let user = match resolved {
        Some(Extension(user)) if user.id == principal.subject => user,
        _ => directory.get_user(&principal.subject).await?,
    };
    Ok(Json(user.into()))
}

/// health
///
/// [Public Route] Liveness probe for load balancers.
pub async fn health(State(config): State<AppConfig>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available".to_string(),
        environment: config.env.to_string(),
    })
}

/// Fallback for every path no route claims.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
