//! Merge request creation workflow.
//!
//! Preloads branch and member choices, validates the form, verifies the
//! branches on the server and creates the merge request. Title and
//! description can be suggested from the source branch's tip commit.

use crate::error::AppError;
use crate::models::{ApiResult, Branch, Commit, Member, MergeRequest};
use crate::services::git_remote::GitMetadataProvider;
use crate::services::gitlab_client::GitLabApiClient;
use crate::services::gitlab_dto::CreateMergeRequestRequest;
use crate::services::list_controller::sort_branches;
use crate::services::notifications::NotificationSink;
use futures::future::join;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

/// Time allowed for the branch and member preload.
pub const PRELOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Why the creation data could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreloadError {
    /// The server did not answer in time; worth retrying.
    #[error("Loading branches and members timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The server rejected the request.
    #[error("Failed to load {resource}: {message}")]
    Remote {
        resource: &'static str,
        message: String,
        status_code: i32,
    },
}

impl From<PreloadError> for AppError {
    fn from(err: PreloadError) -> Self {
        match err {
            PreloadError::Timeout(_) => AppError::timeout(err.to_string()),
            PreloadError::Remote {
                message,
                status_code,
                ..
            } => match u16::try_from(status_code) {
                Ok(code) => AppError::GitLabApi {
                    message,
                    status_code: Some(code),
                    endpoint: None,
                },
                Err(_) => AppError::network(message),
            },
        }
    }
}

/// Choices offered by the creation form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreationData {
    /// Ordered for a branch picker.
    pub branches: Vec<Branch>,

    pub members: Vec<Member>,

    /// Set when members could not be loaded; the form still works without
    /// an assignee list.
    pub members_error: Option<String>,
}

/// Fetch branches and members concurrently under one timeout.
pub async fn preload_creation_data(
    client: &GitLabApiClient,
    project_id: &str,
    timeout: Duration,
) -> Result<CreationData, PreloadError> {
    let fetch = async {
        tokio::join!(
            client.get_project_branches(project_id, None),
            client.get_project_members(project_id)
        )
    };

    let (branches, members) = tokio::time::timeout(timeout, fetch).await.map_err(|_| {
        log::warn!("Preloading creation data for {} timed out", project_id);
        PreloadError::Timeout(timeout)
    })?;

    let status_code = branches.status_code();
    let mut branches = branches
        .into_result()
        .map_err(|e| PreloadError::Remote {
            resource: "branches",
            message: e.message(),
            status_code,
        })?;
    sort_branches(&mut branches);

    let (members, members_error) = match members.into_result() {
        Ok(list) => (list, None),
        Err(e) => {
            log::warn!("Failed to load members of {}: {}", project_id, e);
            (Vec::new(), Some(e.message()))
        }
    };

    Ok(CreationData {
        branches,
        members,
        members_error,
    })
}

/// Title and description proposed for a new merge request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSuggestion {
    pub branch: String,
    pub title: String,
    pub description: String,
}

impl BranchSuggestion {
    fn from_commit(branch: &str, commit: &Commit) -> Self {
        Self {
            branch: branch.to_string(),
            title: commit.title.clone(),
            description: commit.message.clone(),
        }
    }
}

/// Contents of the "new merge request" form.
///
/// Title and description typed by the user are never overwritten by a
/// suggestion until the source branch changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewMergeRequestForm {
    source_branch: String,
    pub target_branch: String,
    title: String,
    description: String,
    pub assignee_id: Option<i64>,
    pub remove_source_branch: bool,
    title_edited: bool,
    description_edited: bool,
    suggested_for: Option<String>,
}

impl NewMergeRequestForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefill the source branch with the checked-out branch.
    pub fn from_current_branch(git: &dyn GitMetadataProvider) -> Result<Self, AppError> {
        let branch = git
            .current_branch_name()
            .filter(|b| !b.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input_field("No branch is checked out", "sourceBranch"))?;
        let mut form = Self::new();
        form.set_source_branch(&branch);
        Ok(form)
    }

    pub fn source_branch(&self) -> &str {
        &self.source_branch
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_source_branch(&mut self, branch: &str) {
        let branch = branch.trim();
        if self.suggested_for.as_deref().is_some_and(|b| b != branch) {
            self.title_edited = false;
            self.description_edited = false;
        }
        self.source_branch = branch.to_string();
    }

    pub fn set_target_branch(&mut self, branch: &str) {
        self.target_branch = branch.trim().to_string();
    }

    /// Set the title as typed by the user.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.title_edited = true;
    }

    /// Set the description as typed by the user.
    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
        self.description_edited = true;
    }

    /// Fill the fields the user has not edited.
    pub fn apply_suggestion(&mut self, suggestion: &BranchSuggestion) {
        if suggestion.branch != self.source_branch {
            return;
        }
        if !self.title_edited {
            self.title = suggestion.title.clone();
        }
        if !self.description_edited {
            self.description = suggestion.description.clone();
        }
        self.suggested_for = Some(suggestion.branch.clone());
    }

    /// Check the form and build the request body.
    pub fn validate(&self) -> Result<CreateMergeRequestRequest, AppError> {
        let source = self.source_branch.trim();
        let target = self.target_branch.trim();
        let title = self.title.trim();

        if source.is_empty() {
            return Err(AppError::invalid_input_field(
                "Please select a source branch",
                "sourceBranch",
            ));
        }
        if target.is_empty() {
            return Err(AppError::invalid_input_field(
                "Please select a target branch",
                "targetBranch",
            ));
        }
        if source == target {
            return Err(AppError::invalid_input_field(
                "Source and target branches must be different",
                "sourceBranch",
            ));
        }
        if title.is_empty() {
            return Err(AppError::invalid_input_field("Please enter a title", "title"));
        }

        let description = self.description.trim();
        let mut request = CreateMergeRequestRequest::new(source, target, title);
        request.description = (!description.is_empty()).then(|| description.to_string());
        request.assignee_id = self.assignee_id;
        request.remove_source_branch = Some(self.remove_source_branch);
        Ok(request)
    }
}

/// Validate the form, verify both branches and create the merge request.
///
/// Reports the outcome through `notifier` exactly once.
pub async fn submit_merge_request(
    client: &GitLabApiClient,
    project_id: &str,
    form: &NewMergeRequestForm,
    notifier: &dyn NotificationSink,
) -> ApiResult<MergeRequest> {
    let request = match form.validate() {
        Ok(request) => request,
        Err(e) => {
            notifier.error("Invalid merge request", &e.message());
            return ApiResult::local_failure(e.message());
        }
    };

    let (source_check, target_check) = join(
        client.get_branch_commit(project_id, &request.source_branch),
        client.get_branch_commit(project_id, &request.target_branch),
    )
    .await;
    for (role, branch, check) in [
        ("Source", &request.source_branch, source_check),
        ("Target", &request.target_branch, target_check),
    ] {
        if !check.success() {
            let message = format!("{} branch '{}' does not exist on the remote", role, branch);
            log::warn!("{}: {}", message, check.error().unwrap_or_default());
            notifier.error("Branch verification failed", &message);
            return ApiResult::failure(message, check.status_code());
        }
    }

    let result = client.create_merge_request(project_id, &request).await;
    match (result.data(), result.error()) {
        (Some(mr), _) => notifier.success(
            "Merge request created",
            &format!("!{} \"{}\" created\n{}", mr.iid, mr.title, mr.web_url),
        ),
        (None, error) => notifier.error(
            "Failed to create merge request",
            error.unwrap_or("Unknown error"),
        ),
    }
    result
}

/// Best-effort title and description suggestions, cached per branch.
pub struct BranchSuggestions {
    client: GitLabApiClient,
    project_id: String,
    cache: Mutex<HashMap<String, Commit>>,
}

impl BranchSuggestions {
    pub fn new(client: GitLabApiClient, project_id: impl Into<String>) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Suggestion from the branch's tip commit; `None` on any failure.
    pub async fn suggest_from_branch(&self, branch: &str) -> Option<BranchSuggestion> {
        let branch = branch.trim();
        if branch.is_empty() {
            return None;
        }
        if let Some(commit) = self.cache.lock().await.get(branch) {
            return Some(BranchSuggestion::from_commit(branch, commit));
        }

        let commit = self
            .client
            .get_branch_commit(&self.project_id, branch)
            .await
            .into_data()?;
        let suggestion = BranchSuggestion::from_commit(branch, &commit);
        self.cache.lock().await.insert(branch.to_string(), commit);
        Some(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled_form() -> NewMergeRequestForm {
        let mut form = NewMergeRequestForm::new();
        form.set_source_branch("feat/x");
        form.set_target_branch("main");
        form.set_title("  Add X  ");
        form
    }

    #[test]
    fn test_validate_builds_request() {
        let mut form = filled_form();
        form.set_description("   ");
        form.assignee_id = Some(7);
        let request = form.validate().unwrap();
        assert_eq!(request.source_branch, "feat/x");
        assert_eq!(request.target_branch, "main");
        assert_eq!(request.title, "Add X");
        assert_eq!(request.description, None);
        assert_eq!(request.assignee_id, Some(7));
        assert_eq!(request.remove_source_branch, Some(false));
    }

    #[test]
    fn test_validate_rejects_incomplete_forms() {
        let field = |form: &NewMergeRequestForm| match form.validate() {
            Err(AppError::InvalidInput { field, .. }) => field,
            other => panic!("expected invalid input, got {:?}", other),
        };

        let mut form = filled_form();
        form.set_source_branch("");
        assert_eq!(field(&form).as_deref(), Some("sourceBranch"));

        let mut form = filled_form();
        form.set_target_branch(" ");
        assert_eq!(field(&form).as_deref(), Some("targetBranch"));

        let mut form = filled_form();
        form.set_target_branch("feat/x");
        assert_eq!(field(&form).as_deref(), Some("sourceBranch"));

        let mut form = filled_form();
        form.set_title("   ");
        assert_eq!(field(&form).as_deref(), Some("title"));
    }

    #[test]
    fn test_suggestion_respects_user_edits() {
        let suggestion = BranchSuggestion {
            branch: "feat/x".into(),
            title: "Commit title".into(),
            description: "Commit body".into(),
        };

        let mut form = NewMergeRequestForm::new();
        form.set_source_branch("feat/x");
        form.set_title("Mine");
        form.apply_suggestion(&suggestion);
        assert_eq!(form.title(), "Mine");
        assert_eq!(form.description(), "Commit body");

        form.set_source_branch("feat/y");
        let other = BranchSuggestion {
            branch: "feat/y".into(),
            title: "Y title".into(),
            description: "Y body".into(),
        };
        form.apply_suggestion(&other);
        assert_eq!(form.title(), "Y title");
        assert_eq!(form.description(), "Y body");

        form.apply_suggestion(&suggestion);
        assert_eq!(form.title(), "Y title");
    }

    #[test]
    fn test_preload_error_maps_to_app_error() {
        let timeout: AppError = PreloadError::Timeout(PRELOAD_TIMEOUT).into();
        assert!(timeout.is_timeout());

        let remote: AppError = PreloadError::Remote {
            resource: "branches",
            message: "404 Project Not Found".into(),
            status_code: 404,
        }
        .into();
        assert_eq!(remote.status_code(), 404);
        assert_eq!(remote.message(), "404 Project Not Found");
    }
}
