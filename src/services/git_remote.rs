//! Git remote URL interpretation.
//!
//! The library never inspects a repository itself; the host supplies remote
//! and branch facts through [`GitMetadataProvider`].

use reqwest::Url;

/// Source of git facts about the repository being browsed.
pub trait GitMetadataProvider: Send + Sync {
    /// URL of the remote the project is matched against (usually `origin`).
    fn current_remote_url(&self) -> Option<String>;

    /// Name of the checked-out branch, if any.
    fn current_branch_name(&self) -> Option<String>;
}

/// Derive a `namespace/project` path from a git remote URL.
///
/// Supports `http(s)://host[:port]/path(.git)`, `ssh://[user@]host[:port]/path(.git)`
/// and scp-like `[user@]host:path(.git)` remotes.
pub fn extract_project_path(remote_url: &str) -> Option<String> {
    let remote = remote_url.trim();
    if remote.is_empty() {
        return None;
    }

    let raw_path = if has_url_scheme(remote) {
        let url = Url::parse(remote).ok()?;
        url.path().to_string()
    } else {
        let (_, path) = remote.split_once(':')?;
        path.to_string()
    };

    let path = raw_path.trim_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path).trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Guess the GitLab server URL from a remote.
///
/// HTTP remotes yield `scheme://host[:port]`; SSH remotes yield the bare host,
/// since the web UI scheme cannot be known from them.
pub fn detect_server_url(remote_url: &str) -> Option<String> {
    let remote = remote_url.trim();
    if remote.is_empty() {
        return None;
    }

    if remote.starts_with("http://") || remote.starts_with("https://") {
        let url = Url::parse(remote).ok()?;
        let host = url.host_str()?;
        return Some(match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        });
    }

    if remote.starts_with("ssh://") {
        let url = Url::parse(remote).ok()?;
        return url.host_str().map(String::from);
    }

    let (user_host, _) = remote.split_once(':')?;
    let host = user_host.rsplit_once('@').map_or(user_host, |(_, h)| h);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Whether the remote looks like it is hosted on GitLab.
pub fn looks_like_gitlab(remote_url: &str) -> bool {
    remote_url.to_ascii_lowercase().contains("gitlab")
}

fn has_url_scheme(remote: &str) -> bool {
    remote.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+')
    })
}
