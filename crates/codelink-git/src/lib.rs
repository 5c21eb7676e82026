use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use codelink_core::{
    ProjectName, ProjectNameError, REPO_DIR_NAME, RemoteUrlError, SharedLog, derive_project_name,
};
use thiserror::Error;

mod client;

pub use client::{GitCli, VcsClient, inspect_repository};

/// Staging directories live next to the projects they publish into. The
/// leading dot keeps them from ever parsing as a project name.
pub const STAGING_PREFIX: &str = ".clone-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneStage {
    Staging,
    Publish,
}

impl fmt::Display for CloneStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staging => f.write_str("staging"),
            Self::Publish => f.write_str("publish"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CloneError {
    #[error("invalid repository URL: {0}")]
    InvalidUrl(#[from] RemoteUrlError),
    #[error("invalid project name: {0}")]
    InvalidProjectName(#[from] ProjectNameError),
    #[error("could not run {program}: {message}")]
    ToolUnavailable { program: String, message: String },
    #[error("Git clone error: {stderr}")]
    ToolFailed { url: String, stderr: String },
    #[error("cloned tree at {} is not a git repository: {message}", path.display())]
    NotARepository { path: PathBuf, message: String },
    #[error("io error during {stage}: {source}")]
    Io {
        stage: CloneStage,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub url: String,
    /// Explicit project name; when absent the name is derived from `url`.
    pub project_name: Option<String>,
}

impl CloneRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            project_name: None,
        }
    }

    pub fn named(url: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            project_name: Some(project_name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    Cloned {
        project: ProjectName,
        head: Option<String>,
    },
    Exists {
        project: ProjectName,
        explicit_name: bool,
    },
}

impl CloneOutcome {
    pub fn project(&self) -> &ProjectName {
        match self {
            Self::Cloned { project, .. } | Self::Exists { project, .. } => project,
        }
    }
}

/// Clones remotes into `<root>/<project>/repo`.
///
/// The clone runs into a staging directory created inside `root`, and is
/// published with a single rename, so the canonical path is either absent or
/// fully populated. There is no locking: two concurrent clones of the same
/// name race on the final rename and the loser reports `Exists`.
pub struct CloneService {
    root: PathBuf,
    client: Arc<dyn VcsClient>,
    log: SharedLog,
}

impl CloneService {
    pub fn new(root: impl Into<PathBuf>, client: Arc<dyn VcsClient>, log: SharedLog) -> Self {
        Self {
            root: root.into(),
            client,
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn repo_path(&self, project: &ProjectName) -> PathBuf {
        self.root.join(project.as_str()).join(REPO_DIR_NAME)
    }

    pub fn exists(&self, project: &ProjectName) -> bool {
        self.repo_path(project).exists()
    }

    pub fn is_cloned(&self, url: &str) -> Result<bool, CloneError> {
        let project = derive_project_name(url)?;
        Ok(self.exists(&project))
    }

    /// Returns the target project and whether the caller named it explicitly.
    pub fn resolve_name(&self, request: &CloneRequest) -> Result<(ProjectName, bool), CloneError> {
        let explicit = request
            .project_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty());

        match explicit {
            Some(name) => {
                // still reject garbage URLs even when the name is supplied
                codelink_core::repository_path(&request.url)?;
                Ok((ProjectName::parse(name)?, true))
            }
            None => Ok((derive_project_name(&request.url)?, false)),
        }
    }

    pub fn clone_project(&self, request: &CloneRequest) -> Result<CloneOutcome, CloneError> {
        let (project, explicit_name) = self.resolve_name(request)?;
        let url = request.url.trim();

        if self.exists(&project) {
            self.log
                .info(&format!("Project '{project}' already exists, skipping clone"));
            return Ok(CloneOutcome::Exists {
                project,
                explicit_name,
            });
        }

        fs::create_dir_all(&self.root).map_err(|source| self.io_failure(CloneStage::Staging, source))?;
        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|source| self.io_failure(CloneStage::Staging, source))?;
        let staged = staging.path().join(REPO_DIR_NAME);
        let canonical = self.repo_path(&project);

        self.log
            .info(&format!("Cloning {url} → {}", canonical.display()));

        if let Err(err) = self.client.clone_repository(url, &staged) {
            self.log.error("Git clone failed", &err);
            return Err(err);
        }

        let head = match self.client.inspect(&staged) {
            Ok(head) => head,
            Err(err) => {
                self.log.error("Cloned tree failed verification", &err);
                return Err(err);
            }
        };

        if let Some(project_dir) = canonical.parent() {
            fs::create_dir_all(project_dir)
                .map_err(|source| self.io_failure(CloneStage::Publish, source))?;
        }
        if canonical.exists() {
            return Ok(CloneOutcome::Exists {
                project,
                explicit_name,
            });
        }

        if let Err(source) = fs::rename(&staged, &canonical) {
            if canonical.exists() {
                return Ok(CloneOutcome::Exists {
                    project,
                    explicit_name,
                });
            }
            return Err(self.io_failure(CloneStage::Publish, source));
        }

        self.log.info(&format!("Clone succeeded as '{project}'"));
        Ok(CloneOutcome::Cloned { project, head })
    }

    fn io_failure(&self, stage: CloneStage, source: io::Error) -> CloneError {
        let err = CloneError::Io { stage, source };
        self.log.error("Unexpected error during clone", &err);
        err
    }
}
