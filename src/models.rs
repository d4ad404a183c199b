use serde::{Deserialize, Serialize};

use crate::identity::User;

/// SettingsResponse
///
/// Body of a successful `/api/settings` or `/admin/settings` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub user_id: String,
    pub user_banned: bool,
}

impl From<User> for SettingsResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            user_banned: user.banned,
        }
    }
}

/// HealthResponse
///
/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub environment: String,
}
