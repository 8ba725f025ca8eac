//! GitLab API v4 wire schemas.
//!
//! One struct per response shape. Optional fields are explicit `Option`s and
//! the documented defaults (`false`, `0`, `[]`) are applied here with
//! `#[serde(default)]`, so the domain models never see a missing value.

use crate::models::{Branch, Commit, ConnectionInfo, Member, MergeRequest, MergeRequestState, Project, User};
use serde::{Deserialize, Serialize};

/// GitLab user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabUser {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub state: Option<String>,
    pub avatar_url: Option<String>,
    pub web_url: Option<String>,
}

impl From<GitLabUser> for User {
    fn from(u: GitLabUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            name: u.name,
            state: u.state,
            avatar_url: u.avatar_url,
            web_url: u.web_url,
        }
    }
}

/// Lenient view of `/user` used by the connection test.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitLabUserSummary {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
}

impl From<GitLabUserSummary> for ConnectionInfo {
    fn from(u: GitLabUserSummary) -> Self {
        Self {
            username: u.username.unwrap_or_default(),
            name: u.name.unwrap_or_default(),
            id: u.id.unwrap_or(0),
        }
    }
}

/// GitLab merge request from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMergeRequest {
    pub id: i64,
    pub iid: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub state: String,
    pub source_branch: String,
    pub target_branch: String,
    pub author: GitLabUser,
    #[serde(default)]
    pub assignees: Option<Vec<GitLabUser>>,
    #[serde(default)]
    pub reviewers: Option<Vec<GitLabUser>>,
    /// GitLab returns a single object here, not an array.
    #[serde(default)]
    pub merged_by: Option<GitLabUser>,
    pub created_at: String,
    pub updated_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,
    pub web_url: String,
    #[serde(default)]
    pub draft: Option<bool>,
    #[serde(default)]
    pub work_in_progress: Option<bool>,
    #[serde(default)]
    pub has_conflicts: Option<bool>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub upvotes: Option<i64>,
    #[serde(default)]
    pub downvotes: Option<i64>,
    #[serde(default)]
    pub user_notes_count: Option<i64>,
    #[serde(default)]
    pub force_remove_source_branch: Option<bool>,
}

fn users(list: Option<Vec<GitLabUser>>) -> Vec<User> {
    list.unwrap_or_default().into_iter().map(User::from).collect()
}

impl From<GitLabMergeRequest> for MergeRequest {
    fn from(mr: GitLabMergeRequest) -> Self {
        Self {
            id: mr.id,
            iid: mr.iid,
            project_id: mr.project_id,
            title: mr.title,
            description: mr.description,
            state: MergeRequestState::from(mr.state.as_str()),
            source_branch: mr.source_branch,
            target_branch: mr.target_branch,
            author: mr.author.into(),
            assignees: users(mr.assignees),
            reviewers: users(mr.reviewers),
            merged_by: mr.merged_by.into_iter().map(User::from).collect(),
            created_at: mr.created_at,
            updated_at: mr.updated_at,
            merged_at: mr.merged_at,
            closed_at: mr.closed_at,
            web_url: mr.web_url,
            draft: mr.draft.unwrap_or(false),
            work_in_progress: mr.work_in_progress.unwrap_or(false),
            has_conflicts: mr.has_conflicts.unwrap_or(false),
            labels: mr.labels.unwrap_or_default(),
            upvotes: mr.upvotes.unwrap_or(0),
            downvotes: mr.downvotes.unwrap_or(0),
            user_notes_count: mr.user_notes_count.unwrap_or(0),
            force_remove_source_branch: mr.force_remove_source_branch.unwrap_or(false),
        }
    }
}

/// GitLab project from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabProject {
    pub id: i64,
    pub name: String,
    pub name_with_namespace: String,
    pub path: String,
    pub path_with_namespace: String,
    pub web_url: String,
    pub default_branch: Option<String>,
    pub ssh_url_to_repo: Option<String>,
    pub http_url_to_repo: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub last_activity_at: String,
}

impl From<GitLabProject> for Project {
    fn from(p: GitLabProject) -> Self {
        Self {
            id: p.id,
            name: p.name,
            name_with_namespace: p.name_with_namespace,
            path: p.path,
            path_with_namespace: p.path_with_namespace,
            web_url: p.web_url,
            default_branch: p.default_branch,
            ssh_url_to_repo: p.ssh_url_to_repo,
            http_url_to_repo: p.http_url_to_repo,
            created_at: p.created_at,
            last_activity_at: p.last_activity_at,
        }
    }
}

/// GitLab commit from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabCommit {
    pub id: String,
    pub short_id: String,
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    #[serde(default)]
    pub authored_date: String,
    #[serde(default)]
    pub committer_name: String,
    #[serde(default)]
    pub committer_email: String,
    #[serde(default)]
    pub committed_date: String,
    #[serde(default)]
    pub web_url: String,
}

impl From<GitLabCommit> for Commit {
    fn from(c: GitLabCommit) -> Self {
        Self {
            id: c.id,
            short_id: c.short_id,
            title: c.title,
            message: c.message,
            author_name: c.author_name,
            author_email: c.author_email,
            authored_date: c.authored_date,
            committer_name: c.committer_name,
            committer_email: c.committer_email,
            committed_date: c.committed_date,
            web_url: c.web_url,
        }
    }
}

/// GitLab branch from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabBranch {
    pub name: String,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub developers_can_push: bool,
    #[serde(default)]
    pub developers_can_merge: bool,
    #[serde(default)]
    pub can_push: bool,
    #[serde(default)]
    pub web_url: String,
    pub commit: GitLabCommit,
}

impl From<GitLabBranch> for Branch {
    fn from(b: GitLabBranch) -> Self {
        Self {
            name: b.name,
            merged: b.merged,
            protected: b.protected,
            default: b.default,
            developers_can_push: b.developers_can_push,
            developers_can_merge: b.developers_can_merge,
            can_push: b.can_push,
            web_url: b.web_url,
            commit: b.commit.into(),
        }
    }
}

/// GitLab project member from API (`/members/all`).
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabMember {
    pub id: i64,
    pub username: String,
    pub name: String,
    #[serde(default)]
    pub state: String,
    pub avatar_url: Option<String>,
    pub web_url: Option<String>,
    #[serde(default)]
    pub access_level: i64,
    pub expires_at: Option<String>,
}

impl From<GitLabMember> for Member {
    fn from(m: GitLabMember) -> Self {
        Self {
            id: m.id,
            username: m.username,
            name: m.name,
            state: m.state,
            avatar_url: m.avatar_url,
            web_url: m.web_url,
            access_level: m.access_level,
            expires_at: m.expires_at,
        }
    }
}

/// Request body for `POST /projects/:id/merge_requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateMergeRequestRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_source_branch: Option<bool>,
}

impl CreateMergeRequestRequest {
    /// Minimal request with only the required fields set.
    pub fn new(
        source_branch: impl Into<String>,
        target_branch: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            source_branch: source_branch.into(),
            target_branch: target_branch.into(),
            title: title.into(),
            description: None,
            assignee_id: None,
            remove_source_branch: None,
        }
    }
}

/// Request body for `PUT /projects/:id/merge_requests/:iid`.
#[derive(Debug, Clone, Serialize)]
pub struct StateEventRequest {
    pub state_event: &'static str,
}

/// Request body for `PUT /projects/:id/merge_requests/:iid/merge`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeRequestMergeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_remove_source_branch: Option<bool>,
}

/// Branch response reduced to its tip commit.
#[derive(Debug, Clone, Deserialize)]
pub struct GitLabBranchTip {
    pub commit: GitLabCommit,
}
