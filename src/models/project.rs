//! GitLab project metadata model.

use serde::{Deserialize, Serialize};

/// A remote GitLab project.
///
/// Fetched by path (or by a path derived from a git remote) and kept only for
/// the lifetime of a browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// GitLab project ID.
    pub id: i64,

    /// Short project name (e.g., "GitLab").
    pub name: String,

    /// Full namespaced name (e.g., "GitLab.org / GitLab").
    pub name_with_namespace: String,

    /// Project slug (e.g., "gitlab").
    pub path: String,

    /// Path with namespace (e.g., "gitlab-org/gitlab").
    pub path_with_namespace: String,

    /// Web URL for the project.
    pub web_url: String,

    pub default_branch: Option<String>,
    pub ssh_url_to_repo: Option<String>,
    pub http_url_to_repo: Option<String>,

    /// ISO 8601 creation timestamp from GitLab.
    pub created_at: String,

    /// ISO 8601 last activity timestamp from GitLab.
    pub last_activity_at: String,
}

impl Project {
    /// Project identifier in the form the API client accepts.
    pub fn api_id(&self) -> String {
        self.id.to_string()
    }
}
