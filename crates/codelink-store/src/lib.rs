use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use codelink_core::{ANALYSIS_DIR_NAME, Document, ProjectName, REPO_DIR_NAME, SharedLog};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentFault {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Missing, unreadable and malformed documents all surface as `Read`; the
/// underlying fault is kept for logging only.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read {document}.json for project '{project}': {source}")]
    Read {
        project: ProjectName,
        document: Document,
        #[source]
        source: DocumentFault,
    },
    #[error("could not write {document}.json for project '{project}': {source}")]
    Write {
        project: ProjectName,
        document: Document,
        #[source]
        source: DocumentFault,
    },
    #[error("could not list projects under {}: {source}", root.display())]
    List {
        root: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub fn document(&self) -> Option<Document> {
        match self {
            Self::Read { document, .. } | Self::Write { document, .. } => Some(*document),
            Self::List { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub name: ProjectName,
    pub has_repo: bool,
    pub has_analysis: bool,
}

pub trait DocumentStore: Send + Sync {
    fn default_project(&self) -> &ProjectName;
    fn read(&self, project: &ProjectName, document: Document) -> Result<Value, StoreError>;
    fn write(
        &self,
        project: &ProjectName,
        document: Document,
        value: &Value,
    ) -> Result<(), StoreError>;
    fn list_projects(&self) -> Result<Vec<ProjectSummary>, StoreError>;
}

/// Documents live at `<root>/<project>/analysis/<document>.json`.
pub struct FsDocumentStore {
    root: PathBuf,
    default_project: ProjectName,
    log: SharedLog,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>, default_project: ProjectName, log: SharedLog) -> Self {
        Self {
            root: root.into(),
            default_project,
            log,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project: &ProjectName) -> PathBuf {
        self.root.join(project.as_str())
    }

    pub fn document_path(&self, project: &ProjectName, document: Document) -> PathBuf {
        self.project_dir(project)
            .join(ANALYSIS_DIR_NAME)
            .join(document.file_name())
    }

    fn read_document(&self, path: &Path) -> Result<Value, DocumentFault> {
        let raw = fs::read(path)?;
        Ok(serde_json::from_slice(&raw)?)
    }

    fn write_document(&self, path: &Path, value: &Value) -> Result<(), DocumentFault> {
        let content = serde_json::to_vec_pretty(value)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}

impl DocumentStore for FsDocumentStore {
    fn default_project(&self) -> &ProjectName {
        &self.default_project
    }

    fn read(&self, project: &ProjectName, document: Document) -> Result<Value, StoreError> {
        let path = self.document_path(project, document);
        self.read_document(&path).map_err(|source| {
            self.log
                .error(&format!("Failed to read {}", document.file_name()), &source);
            StoreError::Read {
                project: project.clone(),
                document,
                source,
            }
        })
    }

    fn write(
        &self,
        project: &ProjectName,
        document: Document,
        value: &Value,
    ) -> Result<(), StoreError> {
        let path = self.document_path(project, document);
        match self.write_document(&path, value) {
            Ok(()) => {
                self.log.info(&format!(
                    "Wrote to {} for project {project}",
                    document.file_name()
                ));
                Ok(())
            }
            Err(source) => {
                self.log
                    .error(&format!("Failed to write {}", document.file_name()), &source);
                Err(StoreError::Write {
                    project: project.clone(),
                    document,
                    source,
                })
            }
        }
    }

    fn list_projects(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::List {
                    root: self.root.clone(),
                    source,
                });
            }
        };

        let mut projects = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::List {
                root: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            // staging directories and stray entries do not parse as names
            let Some(name) = entry
                .file_name()
                .to_str()
                .and_then(|name| ProjectName::parse(name).ok())
            else {
                continue;
            };

            projects.push(ProjectSummary {
                name,
                has_repo: path.join(REPO_DIR_NAME).is_dir(),
                has_analysis: path.join(ANALYSIS_DIR_NAME).is_dir(),
            });
        }

        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }
}
