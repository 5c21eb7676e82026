use thiserror::Error;
use url::Url;

use crate::{ProjectName, ProjectNameError};

pub const SUPPORTED_SCHEMES: [&str; 6] = ["https", "http", "ssh", "git", "git+ssh", "file"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteUrlError {
    #[error("repository URL is empty")]
    Empty,
    #[error("'{0}' is not a repository URL")]
    Unparseable(String),
    #[error("unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("cannot derive a project name from '{url}': {source}")]
    NoProjectName {
        url: String,
        #[source]
        source: ProjectNameError,
    },
}

/// Returns the repository path portion of a remote, for both URL and
/// scp-like (`git@host:org/repo.git`) forms.
pub fn repository_path(remote: &str) -> Result<String, RemoteUrlError> {
    let remote = remote.trim();
    if remote.is_empty() {
        return Err(RemoteUrlError::Empty);
    }

    if !remote.contains("://") {
        if let Some(path) = scp_like_path(remote) {
            return Ok(path.to_owned());
        }
    }

    let url = Url::parse(remote).map_err(|_| RemoteUrlError::Unparseable(remote.to_owned()))?;
    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(RemoteUrlError::UnsupportedScheme(url.scheme().to_owned()));
    }
    if url.scheme() != "file" && url.host_str().is_none_or(str::is_empty) {
        return Err(RemoteUrlError::Unparseable(remote.to_owned()));
    }

    Ok(url.path().to_owned())
}

/// Derives a project name from the final path segment of a remote, dropping
/// its last extension (`https://host/org/repo.git` becomes `repo`).
pub fn derive_project_name(remote: &str) -> Result<ProjectName, RemoteUrlError> {
    let path = repository_path(remote)?;
    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    ProjectName::parse(strip_extension(segment)).map_err(|source| RemoteUrlError::NoProjectName {
        url: remote.trim().to_owned(),
        source,
    })
}

fn scp_like_path(remote: &str) -> Option<&str> {
    let (host, path) = remote.split_once(':')?;
    let host = host.rsplit('@').next()?;

    // a single letter before ':' is a Windows drive, not a host, and a
    // leading ':' in the path is git's `<transport>::<address>` syntax
    if host.len() < 2
        || host.contains('/')
        || path.is_empty()
        || path.starts_with("//")
        || path.starts_with(':')
    {
        return None;
    }

    Some(path)
}

fn strip_extension(segment: &str) -> &str {
    match segment.rfind('.') {
        Some(index) if segment[..index].chars().any(|ch| ch != '.') => &segment[..index],
        _ => segment,
    }
}
