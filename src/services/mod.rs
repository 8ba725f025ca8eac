//! Business logic services.
//!
//! The GitLab transport and client, the merge request list controller, the
//! server configuration store and the merge request creation workflow.
//! Nothing here depends on a particular UI; collaborators such as git
//! metadata and notifications are injected as traits.

pub mod config_store;
pub mod git_remote;
pub mod gitlab_client;
pub mod gitlab_dto;
pub mod list_controller;
pub mod mr_creation;
pub mod notifications;
pub mod session;
pub mod transport;

pub use config_store::{ConfigScope, JsonFileConfigPersistence, ServerConfigStore};
pub use git_remote::GitMetadataProvider;
pub use gitlab_client::GitLabApiClient;
pub use list_controller::{MergeRequestFilter, MergeRequestListController};
pub use notifications::{NotificationKind, NotificationSink};
pub use session::BrowserSession;
pub use transport::ClientConfig;
