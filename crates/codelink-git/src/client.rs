use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::CloneError;

/// External version-control client used to materialize a remote into a local
/// directory.
pub trait VcsClient: Send + Sync {
    /// Clones `url` into `destination`, which must not exist yet.
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), CloneError>;

    /// Checks that `path` holds a repository and returns its HEAD commit id,
    /// if it has one.
    fn inspect(&self, path: &Path) -> Result<Option<String>, CloneError> {
        inspect_repository(path)
    }
}

/// Runs the system `git` binary, so SSH keys, credential helpers and any
/// `~/.gitconfig` settings apply unchanged.
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl VcsClient for GitCli {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), CloneError> {
        let output = Command::new(&self.program)
            .args(["clone", "--quiet", "--", url])
            .arg(destination)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(|err| CloneError::ToolUnavailable {
                program: self.program.display().to_string(),
                message: err.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        let stderr = if stderr.is_empty() {
            match output.status.code() {
                Some(code) => format!("git exited with status {code}"),
                None => "git was terminated by a signal".to_owned(),
            }
        } else {
            stderr
        };

        Err(CloneError::ToolFailed {
            url: url.to_owned(),
            stderr,
        })
    }
}

pub fn inspect_repository(path: &Path) -> Result<Option<String>, CloneError> {
    // open, not discover: a staged tree must not resolve to an enclosing repo
    let repo = gix::open(path).map_err(|err| CloneError::NotARepository {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let head = repo
        .head_id()
        .ok()
        .map(|id| id.detach().to_string().to_ascii_lowercase());
    Ok(head)
}
