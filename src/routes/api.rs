use axum::routing::get;

use crate::{
    AppState,
    group::{RouteError, RouteGroup},
    handlers,
};

/// Registers the user-facing routes. Mounted behind `authenticate` and
/// `log_route`.
pub fn register(group: &mut RouteGroup<AppState>) -> Result<(), RouteError> {
    // GET /api/settings
    group.handle("/settings", get(handlers::user_settings))?;
    Ok(())
}
