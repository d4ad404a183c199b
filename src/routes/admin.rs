use axum::routing::get;

use crate::{
    AppState,
    group::{RouteError, RouteGroup},
    handlers,
};

/// Registers the admin routes. Mounted behind `authenticate`, `log_route`
/// and `authorize_admin`, in that order.
pub fn register(group: &mut RouteGroup<AppState>) -> Result<(), RouteError> {
    // GET /admin/settings
    group.handle("/settings", get(handlers::admin_settings))?;
    Ok(())
}
