use serde::{Deserialize, Serialize};

/// The authenticated account as resolved by the identity backend.
///
/// Held only in the session manager's in-memory state; re-derived from the
/// backend on restart via the session check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}
