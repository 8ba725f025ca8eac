//! GitLab API client.
//!
//! Typed operations over GitLab API v4. Every operation returns an
//! [`ApiResult`]; failures of any kind are folded into the envelope and never
//! escape as `Err` or a panic.

use crate::error::AppError;
use crate::models::{
    ApiResult, Branch, Commit, ConnectionInfo, Member, MergeRequest, Project, ServerConfig, User,
};
use crate::services::git_remote;
use crate::services::gitlab_dto::{
    CreateMergeRequestRequest, GitLabBranch, GitLabBranchTip, GitLabMember, GitLabMergeRequest,
    GitLabProject, GitLabUser, GitLabUserSummary, MergeRequestMergeRequest, StateEventRequest,
};
use crate::services::transport::{self, AuthMode, ClientConfig, HttpJsonTransport, HttpResponse};
use reqwest::Method;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Page size used by the "fetch everything" helpers.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Maximum characters of the second `/user` response echoed in errors.
const AUTH_BODY_PREVIEW: usize = 200;

/// Query parameters for listing merge requests.
///
/// Unset values fall back to `state=all`, `page=1` and the client's default
/// page size. Blank `search` and blank or `all` `scope` are omitted entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeRequestsQuery {
    /// `opened`, `closed`, `locked`, `merged` or `all`.
    pub state: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,

    /// Free-text search over title and description.
    pub search: Option<String>,

    /// `created_by_me`, `assigned_to_me` or `all`.
    pub scope: Option<String>,
}

impl MergeRequestsQuery {
    /// Query for one page in the given state.
    pub fn page(state: impl Into<String>, page: u32, per_page: u32) -> Self {
        Self {
            state: Some(state.into()),
            page: Some(page),
            per_page: Some(per_page),
            ..Self::default()
        }
    }

    /// Query pairs in request order.
    pub fn to_query_pairs(&self, default_per_page: u32) -> Vec<(&'static str, String)> {
        let state = self
            .state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("all");

        let mut pairs = vec![
            ("state", state.to_string()),
            ("page", self.page.unwrap_or(1).to_string()),
            ("per_page", self.per_page.unwrap_or(default_per_page).to_string()),
        ];

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(scope) = effective_scope(self.scope.as_deref()) {
            pairs.push(("scope", scope.to_string()));
        }

        pairs
    }
}

/// The scope value to send, or `None` when it means "no scope filter".
pub fn effective_scope(scope: Option<&str>) -> Option<&str> {
    scope
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
}

/// Encode a project id or path for use as a single URL path segment.
///
/// All-digit ids are passed through; anything else is treated as a
/// `namespace/project` path and percent-encoded, including `/`.
pub fn encode_project_id(project_id: &str) -> String {
    if !project_id.is_empty() && project_id.bytes().all(|b| b.is_ascii_digit()) {
        project_id.to_string()
    } else {
        urlencoding::encode(project_id).into_owned()
    }
}

/// GitLab API client bound to one server and token.
///
/// Clones share the connection pool and the shutdown token.
#[derive(Debug, Clone)]
pub struct GitLabApiClient {
    transport: HttpJsonTransport,
    config: ClientConfig,
    server_url: String,
    shutdown: CancellationToken,
}

impl GitLabApiClient {
    /// Create a new client for `server_url` authenticated with `token`.
    pub fn new(server_url: &str, token: &str, config: ClientConfig) -> Result<Self, AppError> {
        let server_url = ServerConfig::normalize_url(server_url);
        if server_url.is_empty() {
            return Err(AppError::invalid_input_field("Server URL is required", "url"));
        }
        let transport = HttpJsonTransport::new(&server_url, token, &config)?;

        Ok(Self {
            transport,
            config,
            server_url,
            shutdown: CancellationToken::new(),
        })
    }

    /// Create a client from a stored server configuration.
    pub fn for_server(server: &ServerConfig, config: ClientConfig) -> Result<Self, AppError> {
        Self::new(&server.url, &server.token, config)
    }

    /// Server URL without trailing slash.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cancel background work started through this client.
    ///
    /// The pooled connections are released once the last clone is dropped.
    pub fn dispose(&self) {
        log::debug!("Disposing GitLab client for {}", self.server_url);
        self.shutdown.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Run [`test_connection`](Self::test_connection) as a background task.
    ///
    /// The task resolves to `None` if the client is disposed first.
    pub fn spawn_test_connection(&self) -> JoinHandle<Option<ApiResult<ConnectionInfo>>> {
        let client = self.clone();
        let shutdown = self.shutdown.child_token();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    log::debug!("Connection test abandoned: client disposed");
                    None
                }
                result = client.test_connection() => Some(result),
            }
        })
    }

    // ------------------------------------------------------------------
    // User
    // ------------------------------------------------------------------

    /// Verify the server URL and token by fetching `/user`.
    pub async fn test_connection(&self) -> ApiResult<ConnectionInfo> {
        let result = self
            .get_user_dual_auth::<GitLabUserSummary>()
            .await
            .map(|(user, status)| (ConnectionInfo::from(user), status));
        if let Err(e) = &result {
            log::warn!("Connection test against {} failed: {}", self.server_url, e);
        }
        result.into()
    }

    /// Fetch the authenticated user.
    pub async fn get_current_user(&self) -> ApiResult<User> {
        self.get_user_dual_auth::<GitLabUser>()
            .await
            .map(|(user, status)| (User::from(user), status))
            .into()
    }

    /// GET `/user`, first with the token as a query parameter and then with
    /// the `PRIVATE-TOKEN` header.
    ///
    /// A transport failure on either attempt ends the sequence.
    async fn get_user_dual_auth<T: DeserializeOwned>(&self) -> Result<(T, u16), AppError> {
        let endpoint = "/user";

        let first = self
            .transport
            .send::<()>(Method::GET, endpoint, &[], None, AuthMode::QueryParam)
            .await?;
        if first.is_success() {
            return transport::decode(first, endpoint);
        }
        log::info!(
            "Query parameter authentication returned {}, retrying with header",
            first.status.as_u16()
        );

        let second = self
            .transport
            .send::<()>(Method::GET, endpoint, &[], None, AuthMode::Header)
            .await?;
        if second.is_success() {
            return transport::decode(second, endpoint);
        }

        Err(AppError::gitlab_api_full(
            dual_auth_failure_message(&first, &second),
            second.status.as_u16(),
            endpoint,
        ))
    }

    // ------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------

    /// Fetch a project by numeric id or `namespace/project` path.
    pub async fn get_project(&self, project_path: &str) -> ApiResult<Project> {
        let endpoint = format!("/projects/{}", encode_project_id(project_path));
        self.transport
            .get_json::<GitLabProject>(&endpoint, &[])
            .await
            .map(|(p, status)| (Project::from(p), status))
            .into()
    }

    /// Resolve the project a git remote URL points at.
    pub async fn match_project_by_url(&self, remote_url: &str) -> ApiResult<Project> {
        match git_remote::extract_project_path(remote_url) {
            Some(path) => {
                log::debug!("Matched remote {} to project path {}", remote_url, path);
                self.get_project(&path).await
            }
            None => ApiResult::local_failure(format!(
                "Could not extract project path from URL: {}",
                remote_url
            )),
        }
    }

    /// List projects the user is a member of, most recently active first.
    pub async fn get_user_projects(&self, page: u32, per_page: u32) -> ApiResult<Vec<Project>> {
        let query = [
            ("membership", "true".to_string()),
            ("order_by", "last_activity_at".to_string()),
            ("sort", "desc".to_string()),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        self.transport
            .get_json::<Vec<GitLabProject>>("/projects", &query)
            .await
            .map(|(list, status)| (list.into_iter().map(Project::from).collect(), status))
            .into()
    }

    // ------------------------------------------------------------------
    // Merge requests
    // ------------------------------------------------------------------

    /// List one page of merge requests for a project.
    pub async fn get_merge_requests(
        &self,
        project_id: &str,
        query: &MergeRequestsQuery,
    ) -> ApiResult<Vec<MergeRequest>> {
        let endpoint = format!("/projects/{}/merge_requests", encode_project_id(project_id));
        let pairs = query.to_query_pairs(self.config.default_page_size);
        self.transport
            .get_json::<Vec<GitLabMergeRequest>>(&endpoint, &pairs)
            .await
            .map(|(list, status)| (list.into_iter().map(MergeRequest::from).collect(), status))
            .into()
    }

    /// Fetch a single merge request by its project-scoped iid.
    pub async fn get_merge_request(&self, project_id: &str, iid: i64) -> ApiResult<MergeRequest> {
        let endpoint = format!(
            "/projects/{}/merge_requests/{}",
            encode_project_id(project_id),
            iid
        );
        self.transport
            .get_json::<GitLabMergeRequest>(&endpoint, &[])
            .await
            .map(|(mr, status)| (MergeRequest::from(mr), status))
            .into()
    }

    /// Fetch every merge request in `state`, 100 per page.
    ///
    /// `cancel` is checked before each page. A failure on the first page is
    /// reported; a failure on a later page stops paging and returns what was
    /// gathered so far.
    pub async fn get_all_merge_requests(
        &self,
        project_id: &str,
        state: &str,
        cancel: &CancellationToken,
    ) -> ApiResult<Vec<MergeRequest>> {
        let mut all = Vec::new();
        let mut page = 1;
        let mut last_status = 200;

        loop {
            if cancel.is_cancelled() || self.is_disposed() {
                log::debug!("Fetching all merge requests cancelled at page {}", page);
                return ApiResult::failure(AppError::Cancelled.message(), AppError::Cancelled.status_code());
            }

            let query = MergeRequestsQuery::page(state, page, MAX_PAGE_SIZE);
            let result = self.get_merge_requests(project_id, &query).await;
            if !result.success() {
                if page == 1 {
                    return result;
                }
                log::warn!(
                    "Failed to fetch merge request page {}: {}",
                    page,
                    result.error().unwrap_or_default()
                );
                break;
            }

            last_status = result.status_code();
            let items = result.into_data().unwrap_or_default();
            let count = items.len();
            all.extend(items);

            if count < MAX_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }

        ApiResult::ok(all, last_status)
    }

    /// Create a merge request.
    pub async fn create_merge_request(
        &self,
        project_id: &str,
        request: &CreateMergeRequestRequest,
    ) -> ApiResult<MergeRequest> {
        let endpoint = format!("/projects/{}/merge_requests", encode_project_id(project_id));
        let result = self
            .transport
            .send_json::<_, GitLabMergeRequest>(Method::POST, &endpoint, request)
            .await
            .map(|(mr, status)| (MergeRequest::from(mr), status));
        match &result {
            Ok((mr, _)) => log::info!("Created merge request !{} in {}", mr.iid, project_id),
            Err(e) => log::warn!("Failed to create merge request: {}", e),
        }
        result.into()
    }

    /// Close a merge request.
    pub async fn close_merge_request(&self, project_id: &str, iid: i64) -> ApiResult<MergeRequest> {
        let endpoint = format!(
            "/projects/{}/merge_requests/{}",
            encode_project_id(project_id),
            iid
        );
        let body = StateEventRequest {
            state_event: "close",
        };
        self.transport
            .send_json::<_, GitLabMergeRequest>(Method::PUT, &endpoint, &body)
            .await
            .map(|(mr, status)| (MergeRequest::from(mr), status))
            .into()
    }

    /// Merge a merge request, optionally removing its source branch.
    pub async fn merge_merge_request(
        &self,
        project_id: &str,
        iid: i64,
        remove_source_branch: bool,
    ) -> ApiResult<MergeRequest> {
        let endpoint = format!(
            "/projects/{}/merge_requests/{}/merge",
            encode_project_id(project_id),
            iid
        );
        let body = MergeRequestMergeRequest {
            should_remove_source_branch: remove_source_branch.then_some(true),
        };
        self.transport
            .send_json::<_, GitLabMergeRequest>(Method::PUT, &endpoint, &body)
            .await
            .map(|(mr, status)| (MergeRequest::from(mr), status))
            .into()
    }

    /// Delete a merge request.
    pub async fn delete_merge_request(&self, project_id: &str, iid: i64) -> ApiResult<()> {
        let endpoint = format!(
            "/projects/{}/merge_requests/{}",
            encode_project_id(project_id),
            iid
        );
        self.transport
            .send_empty(Method::DELETE, &endpoint)
            .await
            .map(|status| ((), status))
            .into()
    }

    // ------------------------------------------------------------------
    // Repository
    // ------------------------------------------------------------------

    /// List branches, optionally filtered by a search term.
    pub async fn get_project_branches(
        &self,
        project_id: &str,
        search: Option<&str>,
    ) -> ApiResult<Vec<Branch>> {
        let endpoint = format!(
            "/projects/{}/repository/branches",
            encode_project_id(project_id)
        );
        let mut query = Vec::new();
        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("search", term.to_string()));
        }
        self.transport
            .get_json::<Vec<GitLabBranch>>(&endpoint, &query)
            .await
            .map(|(list, status)| (list.into_iter().map(Branch::from).collect(), status))
            .into()
    }

    /// Fetch the tip commit of a branch.
    pub async fn get_branch_commit(&self, project_id: &str, branch_name: &str) -> ApiResult<Commit> {
        let endpoint = format!(
            "/projects/{}/repository/branches/{}",
            encode_project_id(project_id),
            urlencoding::encode(branch_name)
        );
        self.transport
            .get_json::<GitLabBranchTip>(&endpoint, &[])
            .await
            .map(|(tip, status)| (Commit::from(tip.commit), status))
            .into()
    }

    /// List all project members, including inherited ones.
    ///
    /// Follows `Link: rel="next"` until the server stops advertising one.
    pub async fn get_project_members(&self, project_id: &str) -> ApiResult<Vec<Member>> {
        self.collect_linked_pages::<GitLabMember>(&format!(
            "/projects/{}/members/all",
            encode_project_id(project_id)
        ))
        .await
        .map(|(list, status)| (list.into_iter().map(Member::from).collect(), status))
        .into()
    }

    /// GET every page of a list endpoint using web-linking pagination.
    async fn collect_linked_pages<T: DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<(Vec<T>, u16), AppError> {
        let mut all = Vec::new();
        let mut page: u32 = 1;

        loop {
            let query = [
                ("page", page.to_string()),
                ("per_page", MAX_PAGE_SIZE.to_string()),
            ];
            let response = self
                .transport
                .send::<()>(Method::GET, endpoint, &query, None, self.transport.auth_mode())
                .await?;
            let has_next = response.has_next_page();
            let (items, status) = transport::decode::<Vec<T>>(response, endpoint)?;
            all.extend(items);

            if !has_next {
                return Ok((all, status));
            }
            page += 1;
        }
    }
}

/// Error text for a `/user` request rejected under both auth methods.
fn dual_auth_failure_message(first: &HttpResponse, second: &HttpResponse) -> String {
    let preview: String = second.body.chars().take(AUTH_BODY_PREVIEW).collect();
    let preview = if preview.trim().is_empty() {
        "No response body".to_string()
    } else {
        preview
    };

    format!(
        "HTTP {code2} - Authentication failed\n\n\
         Both authentication methods failed:\n  \
         Method 1 (URL parameter): {code1}\n  \
         Method 2 (Header): {code2}\n\n\
         Response: {preview}",
        code1 = first.status.as_u16(),
        code2 = second.status.as_u16(),
        preview = preview,
    )
}
