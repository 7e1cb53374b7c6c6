//! User read model consumed by the scheduling core.

use serde::{Deserialize, Serialize};

use crate::api::UserId;

/// Minimal user projection: the core only needs a photographer's location
/// (for holiday calendar resolution) and preferred timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub full_name: String,
    pub city: String,
    pub state: String,
    pub timezone: Option<String>,
    /// Whether the user holds an active photographer role.
    pub photographer: bool,
}

/// A push-notification device token registered by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceToken {
    pub user_id: UserId,
    pub token: String,
    pub opted_in: bool,
}
