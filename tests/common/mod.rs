//! Shared fixtures for integration tests against a mocked GitLab.

#![allow(dead_code)]

use gitlab_mr_browser::services::{ClientConfig, GitLabApiClient, GitMetadataProvider};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "glpat-test-token";

/// Client pointed at the mock server.
pub fn client(server: &MockServer) -> GitLabApiClient {
    GitLabApiClient::new(&server.uri(), TOKEN, ClientConfig::default()).unwrap()
}

pub fn user_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "name": format!("User {}", username),
        "state": "active",
        "avatar_url": null,
        "web_url": format!("https://gitlab.example.com/{}", username)
    })
}

/// A merge request as GitLab returns it, with optional fields left out.
pub fn mr_json(iid: i64, state: &str) -> Value {
    json!({
        "id": 1000 + iid,
        "iid": iid,
        "project_id": 42,
        "title": format!("MR {}", iid),
        "description": null,
        "state": state,
        "source_branch": format!("feature-{}", iid),
        "target_branch": "main",
        "author": user_json(1, "dev"),
        "created_at": "2024-03-01T10:00:00Z",
        "updated_at": "2024-03-01T11:00:00Z",
        "merged_at": null,
        "closed_at": null,
        "web_url": format!("https://gitlab.example.com/group/proj/-/merge_requests/{}", iid)
    })
}

pub fn mr_page(iids: std::ops::RangeInclusive<i64>, state: &str) -> Value {
    Value::Array(iids.map(|iid| mr_json(iid, state)).collect())
}

pub fn commit_json(title: &str, committed: &str) -> Value {
    json!({
        "id": "0123456789abcdef",
        "short_id": "01234567",
        "title": title,
        "message": format!("{}\n\nDetails for {}", title, title),
        "author_name": "Dev",
        "author_email": "dev@example.com",
        "authored_date": committed,
        "committer_name": "Dev",
        "committer_email": "dev@example.com",
        "committed_date": committed,
        "web_url": "https://gitlab.example.com/group/proj/-/commit/0123456789abcdef"
    })
}

pub fn branch_json(name: &str, committed: &str) -> Value {
    json!({
        "name": name,
        "merged": false,
        "protected": name == "main",
        "default": name == "main",
        "developers_can_push": true,
        "developers_can_merge": true,
        "can_push": true,
        "web_url": format!("https://gitlab.example.com/group/proj/-/tree/{}", name),
        "commit": commit_json(&format!("Tip of {}", name), committed)
    })
}

pub fn member_json(id: i64) -> Value {
    json!({
        "id": id,
        "username": format!("member{}", id),
        "name": format!("Member {}", id),
        "state": "active",
        "avatar_url": null,
        "web_url": null,
        "access_level": 30,
        "expires_at": null
    })
}

pub fn project_json() -> Value {
    json!({
        "id": 42,
        "name": "proj",
        "name_with_namespace": "Group / proj",
        "path": "proj",
        "path_with_namespace": "group/proj",
        "web_url": "https://gitlab.example.com/group/proj",
        "default_branch": "main",
        "ssh_url_to_repo": "git@gitlab.example.com:group/proj.git",
        "http_url_to_repo": "https://gitlab.example.com/group/proj.git",
        "created_at": "2023-01-01T00:00:00Z",
        "last_activity_at": "2024-03-01T00:00:00Z"
    })
}

/// Git metadata with fixed answers.
pub struct FixedGit {
    pub remote: Option<String>,
    pub branch: Option<String>,
}

impl FixedGit {
    pub fn new(remote: &str, branch: &str) -> Self {
        Self {
            remote: Some(remote.to_string()),
            branch: Some(branch.to_string()),
        }
    }
}

impl GitMetadataProvider for FixedGit {
    fn current_remote_url(&self) -> Option<String> {
        self.remote.clone()
    }

    fn current_branch_name(&self) -> Option<String> {
        self.branch.clone()
    }
}
