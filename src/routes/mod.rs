//! Route group registrations.
//!
//! Each module fills one group. The group's prefix and middleware chain are
//! chosen where it is mounted (`create_router`), so these functions only list
//! prefix-relative paths and their handlers.

/// `/api`: any signed-in user.
pub mod api;

/// `/admin`: signed-in users holding the admin role.
pub mod admin;
