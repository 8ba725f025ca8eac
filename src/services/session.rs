//! Browsing session bootstrap.
//!
//! Ties a server configuration and the local git checkout to a project on
//! the server and opens its merge request list.

use crate::error::AppError;
use crate::models::{ApiResult, MergeRequest, Project, ServerConfig};
use crate::services::git_remote::{self, GitMetadataProvider};
use crate::services::gitlab_client::GitLabApiClient;
use crate::services::list_controller::{MergeRequestFilter, MergeRequestListController};
use crate::services::mr_creation::{
    self, BranchSuggestions, CreationData, NewMergeRequestForm, PreloadError, PRELOAD_TIMEOUT,
};
use crate::services::notifications::NotificationSink;
use crate::services::transport::ClientConfig;
use std::sync::Arc;
use thiserror::Error;

/// The step at which opening a session failed.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("Could not create a client for {server}: {source}")]
    Client { server: String, source: AppError },

    #[error("The repository has no remote URL")]
    NoRemote,

    #[error("Could not derive a project path from remote {remote}")]
    UnrecognizedRemote { remote: String },

    #[error("Project {path} could not be loaded: {message}")]
    ProjectLookup {
        path: String,
        message: String,
        status_code: i32,
    },

    #[error("Merge requests could not be loaded: {0}")]
    InitialLoad(AppError),
}

/// An open merge request browser for one project on one server.
pub struct BrowserSession {
    server: ServerConfig,
    project: Project,
    notifier: Arc<dyn NotificationSink>,
    controller: MergeRequestListController,
    suggestions: BranchSuggestions,
}

impl BrowserSession {
    /// Resolve the project behind the git remote and load its merge requests.
    ///
    /// Failures are also reported through `notifier`.
    pub async fn open(
        server: &ServerConfig,
        git: &dyn GitMetadataProvider,
        notifier: Arc<dyn NotificationSink>,
        config: ClientConfig,
    ) -> Result<Self, SessionError> {
        match Self::open_inner(server, git, notifier.clone(), config).await {
            Ok(session) => Ok(session),
            Err(e) => {
                log::warn!("Failed to open session on {}: {}", server.label(), e);
                notifier.error("Failed to load merge requests", &e.to_string());
                Err(e)
            }
        }
    }

    async fn open_inner(
        server: &ServerConfig,
        git: &dyn GitMetadataProvider,
        notifier: Arc<dyn NotificationSink>,
        config: ClientConfig,
    ) -> Result<Self, SessionError> {
        let client =
            GitLabApiClient::for_server(server, config).map_err(|source| SessionError::Client {
                server: server.label().to_string(),
                source,
            })?;

        let remote = git
            .current_remote_url()
            .filter(|r| !r.trim().is_empty())
            .ok_or(SessionError::NoRemote)?;
        if !git_remote::looks_like_gitlab(&remote) {
            log::debug!("Remote {} does not mention gitlab, trying anyway", remote);
        }
        let path = git_remote::extract_project_path(&remote)
            .ok_or_else(|| SessionError::UnrecognizedRemote {
                remote: remote.clone(),
            })?;

        let lookup = client.get_project(&path).await;
        let status_code = lookup.status_code();
        let project = lookup
            .into_result()
            .map_err(|e| SessionError::ProjectLookup {
                path: path.clone(),
                message: e.message(),
                status_code,
            })?;
        log::info!(
            "Browsing {} (project {}) on {}",
            project.path_with_namespace,
            project.id,
            client.server_url()
        );

        let project_id = project.api_id();
        let controller =
            MergeRequestListController::new(client.clone(), project_id.clone(), notifier.clone());
        controller
            .apply_filter(MergeRequestFilter::default())
            .await
            .map_err(SessionError::InitialLoad)?;

        Ok(Self {
            server: server.clone(),
            project,
            notifier,
            controller,
            suggestions: BranchSuggestions::new(client, project_id),
        })
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn controller(&self) -> &MergeRequestListController {
        &self.controller
    }

    pub fn suggestions(&self) -> &BranchSuggestions {
        &self.suggestions
    }

    /// Load the branch and member choices for a new merge request.
    pub async fn preload_creation_data(&self) -> Result<CreationData, PreloadError> {
        let result = mr_creation::preload_creation_data(
            self.controller.client(),
            self.controller.project_id(),
            PRELOAD_TIMEOUT,
        )
        .await;
        if let Err(e) = &result {
            self.notifier.error("Failed to load branches", &e.to_string());
        }
        result
    }

    /// Create a merge request, then silently refresh the list.
    pub async fn submit_merge_request(&self, form: &NewMergeRequestForm) -> ApiResult<MergeRequest> {
        let result = mr_creation::submit_merge_request(
            self.controller.client(),
            self.controller.project_id(),
            form,
            self.notifier.as_ref(),
        )
        .await;
        if result.success() {
            if let Err(e) = self.controller.refresh_silently().await {
                log::warn!("Failed to refresh after creating merge request: {}", e);
            }
        }
        result
    }

    /// Cancel background work and release the client.
    pub fn close(self) {
        self.controller.client().dispose();
    }
}
