//! Project member model.

use serde::{Deserialize, Serialize};

/// A project member, including members inherited from parent groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub state: String,
    pub avatar_url: Option<String>,
    pub web_url: Option<String>,

    /// GitLab access level (10 guest .. 50 owner).
    pub access_level: i64,
    pub expires_at: Option<String>,
}
