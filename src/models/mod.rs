//! Data models for the application.
//!
//! These models are the normalized domain entities handed to the presentation
//! layer. Wire formats live in `services::gitlab_dto`; nothing here knows about
//! GitLab's JSON field names.

pub mod api_result;
pub mod branch;
pub mod member;
pub mod merge_request;
pub mod project;
pub mod server_config;
pub mod user;

// Re-exports for convenient access
pub use api_result::ApiResult;
pub use branch::{Branch, Commit};
pub use member::Member;
pub use merge_request::{MergeRequest, MergeRequestState};
pub use project::Project;
pub use server_config::ServerConfig;
pub use user::{ConnectionInfo, User};
