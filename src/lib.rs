//! GitLab MR Browser - merge request browsing for developer tools.
//!
//! A host (an editor plugin, a TUI, a desktop app) embeds this library to
//! list, filter, create, close, merge and delete GitLab merge requests for the
//! repository it has open. The host supplies git facts and renders
//! notifications; everything between the UI and the GitLab REST API lives here.

pub mod error;
pub mod models;
pub mod services;

pub use error::AppError;
pub use models::ApiResult;
