//! Repository branch and commit models.

use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// A commit, as embedded in branch responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub id: String,
    pub short_id: String,
    pub title: String,
    pub message: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_date: String,
    pub committer_name: String,
    pub committer_email: String,
    pub committed_date: String,
    pub web_url: String,
}

impl Commit {
    /// Committed timestamp in milliseconds since the Unix epoch.
    ///
    /// Unparsable timestamps count as the epoch itself.
    pub fn committed_millis(&self) -> i64 {
        DateTime::parse_from_rfc3339(&self.committed_date)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0)
    }
}

/// A repository branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub name: String,
    pub merged: bool,
    pub protected: bool,
    pub default: bool,
    pub developers_can_push: bool,
    pub developers_can_merge: bool,
    pub can_push: bool,
    pub web_url: String,
    pub commit: Commit,
}
