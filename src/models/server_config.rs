//! GitLab server configuration model.

use serde::{Deserialize, Serialize};

/// Prefix of generated server ids.
const ID_PREFIX: &str = "gitlab_server_";

/// Represents a configured GitLab server connection.
///
/// `is_default = true` marks an application-wide config shared by every
/// project; `false` marks a project-scoped one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Opaque identifier; identity of the config.
    pub id: String,

    /// Display name for the server.
    #[serde(default)]
    pub name: String,

    /// GitLab instance URL without trailing slash (e.g., `https://gitlab.com`).
    pub url: String,

    /// Personal or project access token with `api` scope.
    pub token: String,

    #[serde(default)]
    pub is_default: bool,
}

impl ServerConfig {
    /// Create a config with a freshly generated id and a normalized URL.
    pub fn new(
        name: impl Into<String>,
        url: &str,
        token: impl Into<String>,
        is_default: bool,
    ) -> Self {
        Self {
            id: Self::generate_id(),
            name: name.into(),
            url: Self::normalize_url(url),
            token: token.into(),
            is_default,
        }
    }

    /// Generate a new unique server id.
    pub fn generate_id() -> String {
        format!("{}{}", ID_PREFIX, uuid::Uuid::new_v4().simple())
    }

    /// Normalize the URL by trimming whitespace and trailing slashes.
    pub fn normalize_url(url: &str) -> String {
        url.trim().trim_end_matches('/').to_string()
    }

    /// Display label: the name, or the URL when no name was given.
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.url
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            ServerConfig::normalize_url("https://gitlab.com/"),
            "https://gitlab.com"
        );
        assert_eq!(
            ServerConfig::normalize_url("https://gitlab.com"),
            "https://gitlab.com"
        );
        assert_eq!(
            ServerConfig::normalize_url("  https://my.gitlab.server/// "),
            "https://my.gitlab.server"
        );
    }

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = ServerConfig::new("A", "https://a.example.com/", "t1", true);
        let b = ServerConfig::new("B", "https://b.example.com", "t2", false);
        assert!(a.id.starts_with("gitlab_server_"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.url, "https://a.example.com");
    }

    #[test]
    fn test_label_falls_back_to_url() {
        let unnamed = ServerConfig::new("", "https://gitlab.com", "t", true);
        assert_eq!(unnamed.label(), "https://gitlab.com");
        let named = ServerConfig::new("Work", "https://gitlab.com", "t", true);
        assert_eq!(named.label(), "Work");
    }

    #[test]
    fn test_serialized_field_names() {
        let cfg = ServerConfig {
            id: "gitlab_server_1".into(),
            name: "Work".into(),
            url: "https://gitlab.com".into(),
            token: "secret".into(),
            is_default: true,
        };
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"isDefault\":true"));
    }
}
