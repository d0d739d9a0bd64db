use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Session token payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user: Uuid, // user ID
    pub iat: usize, // issued at (unix timestamp)
    /// Only present when a TTL is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<usize>,
}
