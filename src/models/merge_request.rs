//! Merge request model.

use super::user::User;
use serde::{Deserialize, Serialize};

/// State of a merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRequestState {
    Opened,
    Closed,
    Locked,
    Merged,
}

impl MergeRequestState {
    /// Value for the `state` query parameter of the merge request list endpoint.
    pub fn as_api_param(&self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
            Self::Locked => "locked",
            Self::Merged => "merged",
        }
    }
}

impl From<&str> for MergeRequestState {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "closed" => Self::Closed,
            "locked" => Self::Locked,
            "merged" => Self::Merged,
            _ => Self::Opened,
        }
    }
}

impl std::fmt::Display for MergeRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_param())
    }
}

/// Represents a GitLab merge request.
///
/// `iid` together with `project_id` addresses the MR for every follow-up
/// operation; the global `id` is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    /// GitLab MR ID (global).
    pub id: i64,

    /// Project-scoped MR number.
    pub iid: i64,

    /// GitLab project ID.
    pub project_id: i64,

    /// MR title.
    pub title: String,

    /// MR description (Markdown).
    pub description: Option<String>,

    /// Current state.
    pub state: MergeRequestState,

    /// Branch being merged.
    pub source_branch: String,

    /// Destination branch.
    pub target_branch: String,

    pub author: User,
    pub assignees: Vec<User>,
    pub reviewers: Vec<User>,

    /// Zero or one user; GitLab reports a single `merged_by` object.
    pub merged_by: Vec<User>,

    /// ISO 8601 timestamps as returned by GitLab.
    pub created_at: String,
    pub updated_at: String,
    pub merged_at: Option<String>,
    pub closed_at: Option<String>,

    /// URL to MR in GitLab web UI.
    pub web_url: String,

    pub draft: bool,
    pub work_in_progress: bool,
    pub has_conflicts: bool,
    pub labels: Vec<String>,
    pub upvotes: i64,
    pub downvotes: i64,
    pub user_notes_count: i64,
    pub force_remove_source_branch: bool,
}

impl MergeRequest {
    /// Check if the MR is open.
    pub fn is_open(&self) -> bool {
        self.state == MergeRequestState::Opened
    }

    /// Whether a state filter would still include this MR.
    ///
    /// `None` means "all states".
    pub fn matches_state(&self, filter: Option<MergeRequestState>) -> bool {
        filter.map_or(true, |state| state == self.state)
    }

    /// The user who merged this MR, if any.
    pub fn merged_by_user(&self) -> Option<&User> {
        self.merged_by.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_str() {
        assert_eq!(MergeRequestState::from("opened"), MergeRequestState::Opened);
        assert_eq!(MergeRequestState::from("MERGED"), MergeRequestState::Merged);
        assert_eq!(MergeRequestState::from("Closed"), MergeRequestState::Closed);
        assert_eq!(MergeRequestState::from("locked"), MergeRequestState::Locked);
        assert_eq!(MergeRequestState::from("unknown"), MergeRequestState::Opened);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(MergeRequestState::Opened.to_string(), "opened");
        assert_eq!(MergeRequestState::Merged.to_string(), "merged");
        assert_eq!(MergeRequestState::Closed.to_string(), "closed");
        assert_eq!(MergeRequestState::Locked.to_string(), "locked");
    }

    #[test]
    fn test_matches_state() {
        let author = User {
            id: 1,
            username: "dev".into(),
            name: "Dev".into(),
            state: None,
            avatar_url: None,
            web_url: None,
        };
        let mr = MergeRequest {
            id: 10,
            iid: 1,
            project_id: 42,
            title: "Add feature".into(),
            description: None,
            state: MergeRequestState::Merged,
            source_branch: "feat".into(),
            target_branch: "main".into(),
            author: author.clone(),
            assignees: vec![],
            reviewers: vec![],
            merged_by: vec![author],
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: "2024-01-02T00:00:00Z".into(),
            merged_at: Some("2024-01-02T00:00:00Z".into()),
            closed_at: None,
            web_url: "https://gitlab.example.com/g/p/-/merge_requests/1".into(),
            draft: false,
            work_in_progress: false,
            has_conflicts: false,
            labels: vec![],
            upvotes: 0,
            downvotes: 0,
            user_notes_count: 0,
            force_remove_source_branch: false,
        };

        assert!(mr.matches_state(None));
        assert!(mr.matches_state(Some(MergeRequestState::Merged)));
        assert!(!mr.matches_state(Some(MergeRequestState::Opened)));
        assert!(!mr.is_open());
        assert_eq!(mr.merged_by_user().map(|u| u.username.as_str()), Some("dev"));
    }
}
