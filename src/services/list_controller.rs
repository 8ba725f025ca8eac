//! Merge request list controller.
//!
//! Owns the merge request list of one browsing session (one project on one
//! server) and mediates filter changes, "load more" pagination, silent
//! refreshes and single-item mutations.
//!
//! State sits behind an async mutex that is never held across an HTTP call.
//! Every fetch is tagged with the generation it was issued under; filter
//! changes and refreshes bump the generation so late responses for a
//! superseded filter are dropped instead of applied.

use crate::error::AppError;
use crate::models::{Branch, MergeRequest, MergeRequestState};
use crate::services::gitlab_client::{GitLabApiClient, MergeRequestsQuery};
use crate::services::notifications::NotificationSink;
use serde::Serialize;
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Merge requests fetched per page by the list unless configured otherwise.
pub const LIST_PAGE_SIZE: u32 = 100;

/// Active list filter. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequestFilter {
    pub state: Option<MergeRequestState>,
    pub scope: Option<String>,
    pub title_keyword: Option<String>,
}

impl MergeRequestFilter {
    pub fn new(
        state: Option<MergeRequestState>,
        scope: Option<&str>,
        title_keyword: Option<&str>,
    ) -> Self {
        Self {
            state,
            scope: scope.map(str::trim).filter(|s| !s.is_empty()).map(String::from),
            title_keyword: title_keyword
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        }
    }

    /// Filter matching only merge requests in `state`.
    pub fn by_state(state: MergeRequestState) -> Self {
        Self::new(Some(state), None, None)
    }

    fn to_query(&self, page: u32, per_page: u32) -> MergeRequestsQuery {
        MergeRequestsQuery {
            state: Some(
                self.state
                    .map_or("all", |s| s.as_api_param())
                    .to_string(),
            ),
            page: Some(page),
            per_page: Some(per_page),
            search: self.title_keyword.clone(),
            scope: self.scope.clone(),
        }
    }
}

/// A change made to a single merge request outside the list fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteMutation {
    /// The merge request now looks like this (after close or merge).
    Updated(MergeRequest),
    /// The merge request with this iid no longer exists.
    Deleted { iid: i64 },
}

/// What a controller operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and applied.
    Loaded { fetched: usize },
    /// The list was patched locally without a fetch.
    Patched,
    /// Nothing to do (no more pages, or a load already in flight).
    Skipped,
    /// The response arrived for a superseded filter and was dropped.
    Stale,
}

/// Immutable view of the list for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListSnapshot {
    pub items: Vec<MergeRequest>,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    pub is_loading_more: bool,

    /// A page-1 load with the list cleared (show a placeholder).
    pub is_loading: bool,

    /// A page-1 reload with the old items still visible.
    pub is_refreshing: bool,

    pub filter: MergeRequestFilter,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
struct ListState {
    items: Vec<MergeRequest>,
    page: u32,
    has_more: bool,
    is_loading_more: bool,
    is_loading: bool,
    is_refreshing: bool,
    filter: MergeRequestFilter,
    generation: u64,
    last_error: Option<String>,
}

/// Controller for the merge request list of one project.
pub struct MergeRequestListController {
    client: GitLabApiClient,
    project_id: String,
    notifier: Arc<dyn NotificationSink>,
    page_size: u32,
    state: Mutex<ListState>,
}

impl MergeRequestListController {
    pub fn new(
        client: GitLabApiClient,
        project_id: impl Into<String>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            client,
            project_id: project_id.into(),
            notifier,
            page_size: LIST_PAGE_SIZE,
            state: Mutex::new(ListState {
                page: 1,
                ..ListState::default()
            }),
        }
    }

    /// Use a different page size (at least 1).
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn client(&self) -> &GitLabApiClient {
        &self.client
    }

    pub async fn snapshot(&self) -> ListSnapshot {
        let state = self.state.lock().await;
        ListSnapshot {
            items: state.items.clone(),
            page: state.page,
            page_size: self.page_size,
            has_more: state.has_more,
            is_loading_more: state.is_loading_more,
            is_loading: state.is_loading,
            is_refreshing: state.is_refreshing,
            filter: state.filter.clone(),
            last_error: state.last_error.clone(),
        }
    }

    /// Replace the filter and load page 1 for it.
    ///
    /// The list is cleared immediately; any load still in flight for an
    /// earlier filter is ignored when it completes.
    pub async fn apply_filter(&self, filter: MergeRequestFilter) -> Result<LoadOutcome, AppError> {
        let (generation, query) = {
            let mut state = self.state.lock().await;
            state.filter = filter;
            state.items.clear();
            state.page = 1;
            state.has_more = false;
            state.is_loading_more = false;
            state.is_loading = true;
            state.is_refreshing = false;
            state.last_error = None;
            state.generation += 1;
            (state.generation, state.filter.to_query(1, self.page_size))
        };

        log::debug!(
            "Loading merge requests for {} (generation {})",
            self.project_id,
            generation
        );
        let result = self.fetch(&query).await;
        self.apply_first_page(generation, result).await
    }

    /// Reload page 1 of the current filter, keeping the current items
    /// visible until the response replaces them.
    pub async fn refresh_silently(&self) -> Result<LoadOutcome, AppError> {
        let (generation, query) = {
            let mut state = self.state.lock().await;
            state.is_loading_more = false;
            state.is_refreshing = true;
            state.generation += 1;
            (state.generation, state.filter.to_query(1, self.page_size))
        };

        let result = self.fetch(&query).await;
        self.apply_first_page(generation, result).await
    }

    /// Fetch and append the next page.
    ///
    /// A no-op while another page is loading, while page 1 is being
    /// refreshed, or when the last page was short.
    pub async fn load_more(&self) -> Result<LoadOutcome, AppError> {
        let (generation, next_page, query) = {
            let mut state = self.state.lock().await;
            // The refresh resets to page 1, so the next page is not known yet.
            if state.is_loading_more || state.is_refreshing || !state.has_more {
                return Ok(LoadOutcome::Skipped);
            }
            state.is_loading_more = true;
            let next_page = state.page + 1;
            (
                state.generation,
                next_page,
                state.filter.to_query(next_page, self.page_size),
            )
        };

        let result = self.fetch(&query).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            log::debug!("Dropping stale page {} for {}", next_page, self.project_id);
            return Ok(LoadOutcome::Stale);
        }
        state.is_loading_more = false;

        match result {
            Ok(items) => {
                let fetched = items.len();
                state.has_more = fetched >= self.page_size as usize;
                state.page = next_page;
                state.items.extend(items);
                state.last_error = None;
                Ok(LoadOutcome::Loaded { fetched })
            }
            Err(e) => {
                log::warn!("Failed to load page {}: {}", next_page, e);
                state.last_error = Some(e.message());
                Err(e)
            }
        }
    }

    /// Reflect a close, merge or delete in the list.
    ///
    /// Updates are patched in place. When the active state filter no longer
    /// matches, or the item was deleted, the current filter is re-run against
    /// the server instead of filtering locally.
    pub async fn apply_remote_mutation(
        &self,
        mutation: RemoteMutation,
    ) -> Result<LoadOutcome, AppError> {
        let filter = {
            let mut state = self.state.lock().await;
            match mutation {
                RemoteMutation::Updated(mr) => {
                    let refetch = !mr.matches_state(state.filter.state);
                    if let Some(slot) = state.items.iter_mut().find(|item| item.iid == mr.iid) {
                        *slot = mr;
                    }
                    if !refetch {
                        return Ok(LoadOutcome::Patched);
                    }
                }
                RemoteMutation::Deleted { iid } => {
                    state.items.retain(|item| item.iid != iid);
                }
            }
            state.filter.clone()
        };

        self.apply_filter(filter).await
    }

    /// Close a merge request and update the list.
    pub async fn close_merge_request(&self, iid: i64) -> Result<MergeRequest, AppError> {
        let result = self
            .client
            .close_merge_request(&self.project_id, iid)
            .await
            .into_result();
        match result {
            Ok(mr) => {
                self.notifier
                    .success("Merge request closed", &format!("!{} {}", mr.iid, mr.title));
                self.follow_up(RemoteMutation::Updated(mr.clone())).await;
                Ok(mr)
            }
            Err(e) => {
                self.notifier.error("Failed to close merge request", &e.message());
                Err(e)
            }
        }
    }

    /// Merge a merge request and update the list.
    pub async fn merge_merge_request(
        &self,
        iid: i64,
        remove_source_branch: bool,
    ) -> Result<MergeRequest, AppError> {
        let result = self
            .client
            .merge_merge_request(&self.project_id, iid, remove_source_branch)
            .await
            .into_result();
        match result {
            Ok(mr) => {
                let body = if remove_source_branch {
                    format!("!{} merged, source branch {} will be removed", mr.iid, mr.source_branch)
                } else {
                    format!("!{} merged", mr.iid)
                };
                self.notifier.success("Merge request merged", &body);
                self.follow_up(RemoteMutation::Updated(mr.clone())).await;
                Ok(mr)
            }
            Err(e) => {
                self.notifier.error("Failed to merge merge request", &e.message());
                Err(e)
            }
        }
    }

    /// Delete a merge request and update the list.
    pub async fn delete_merge_request(&self, iid: i64) -> Result<(), AppError> {
        let result = self
            .client
            .delete_merge_request(&self.project_id, iid)
            .await
            .into_result();
        match result {
            Ok(()) => {
                self.notifier
                    .success("Merge request deleted", &format!("!{} deleted", iid));
                self.follow_up(RemoteMutation::Deleted { iid }).await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error("Failed to delete merge request", &e.message());
                Err(e)
            }
        }
    }

    /// Apply a mutation after a successful action; the action already
    /// reported its outcome, so a failed re-fetch is only logged.
    async fn follow_up(&self, mutation: RemoteMutation) {
        if let Err(e) = self.apply_remote_mutation(mutation).await {
            log::warn!("Failed to reload merge requests after change: {}", e);
        }
    }

    async fn fetch(&self, query: &MergeRequestsQuery) -> Result<Vec<MergeRequest>, AppError> {
        self.client
            .get_merge_requests(&self.project_id, query)
            .await
            .into_result()
    }

    async fn apply_first_page(
        &self,
        generation: u64,
        result: Result<Vec<MergeRequest>, AppError>,
    ) -> Result<LoadOutcome, AppError> {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            log::debug!("Dropping stale first page for {}", self.project_id);
            return Ok(LoadOutcome::Stale);
        }
        state.is_loading = false;
        state.is_refreshing = false;

        match result {
            Ok(items) => {
                let fetched = items.len();
                state.items = items;
                state.page = 1;
                state.has_more = fetched >= self.page_size as usize;
                state.last_error = None;
                Ok(LoadOutcome::Loaded { fetched })
            }
            Err(e) => {
                log::warn!("Failed to load merge requests: {}", e);
                state.last_error = Some(e.message());
                Err(e)
            }
        }
    }
}

/// Order branches for a branch picker.
///
/// `master`/`main` first, then names containing `test`, then the rest; within
/// each class the most recently committed branch comes first.
pub fn sort_branches(branches: &mut [Branch]) {
    branches.sort_by_key(|b| (branch_class(&b.name), Reverse(b.commit.committed_millis())));
}

fn branch_class(name: &str) -> u8 {
    let lower = name.to_lowercase();
    if lower == "master" || lower == "main" {
        0
    } else if lower.contains("test") {
        1
    } else {
        2
    }
}
