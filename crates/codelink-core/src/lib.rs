use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod log;
pub mod remote;

pub use log::{LogLine, MemoryLog, ServerLog, SharedLog, TracingLog};
pub use remote::{RemoteUrlError, derive_project_name, repository_path};

pub const MAX_PROJECT_NAME_LEN: usize = 128;
pub const REPO_DIR_NAME: &str = "repo";
pub const ANALYSIS_DIR_NAME: &str = "analysis";

/// Named JSON artifacts stored under a project's `analysis/` directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
#[serde(rename_all = "kebab-case")]
pub enum Document {
    Branches,
    FileChanges,
    Explanations,
    UnitTests,
    Impacts,
    DeepDiveAnalysis,
    TestState,
}

impl Document {
    pub const ALL: [Document; 7] = [
        Self::Branches,
        Self::FileChanges,
        Self::Explanations,
        Self::UnitTests,
        Self::Impacts,
        Self::DeepDiveAnalysis,
        Self::TestState,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Branches => "branches",
            Self::FileChanges => "file-changes",
            Self::Explanations => "explanations",
            Self::UnitTests => "unit-tests",
            Self::Impacts => "impacts",
            Self::DeepDiveAnalysis => "deep-dive-analysis",
            Self::TestState => "test-state",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.json", self.as_str())
    }

    /// Only the test-state document is written by the server; the rest are
    /// produced out-of-band.
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::TestState)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Document {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        let value = value.strip_suffix(".json").unwrap_or(value);
        Self::ALL
            .into_iter()
            .find(|document| document.as_str() == value)
            .ok_or_else(|| {
                format!(
                    "invalid document '{value}', expected one of: {}",
                    Self::ALL.map(Document::as_str).join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectNameError {
    #[error("project name is empty")]
    Empty,
    #[error("project name is longer than {MAX_PROJECT_NAME_LEN} bytes")]
    TooLong,
    #[error("project name '{0}' starts with '.'")]
    Hidden(String),
    #[error("project name '{name}' contains {found:?}")]
    InvalidCharacter { name: String, found: char },
}

/// A project directory name: exactly one path segment below the projects root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectName(String);

impl ProjectName {
    pub fn parse(value: &str) -> Result<Self, ProjectNameError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }
        if value.len() > MAX_PROJECT_NAME_LEN {
            return Err(ProjectNameError::TooLong);
        }
        if value.starts_with('.') {
            return Err(ProjectNameError::Hidden(value.to_owned()));
        }
        if let Some(found) = value
            .chars()
            .find(|ch| matches!(ch, '/' | '\\' | ':' | '\0') || ch.is_control())
        {
            return Err(ProjectNameError::InvalidCharacter {
                name: value.to_owned(),
                found,
            });
        }

        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for ProjectName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl TryFrom<String> for ProjectName {
    type Error = ProjectNameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectName> for String {
    fn from(value: ProjectName) -> Self {
        value.0
    }
}

impl std::str::FromStr for ProjectName {
    type Err = ProjectNameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_names_round_trip_through_from_str() {
        for document in Document::ALL {
            let parsed: Document = document.as_str().parse().expect("parse document");
            assert_eq!(parsed, document);
        }

        assert_eq!(
            "unit-tests.json".parse::<Document>(),
            Ok(Document::UnitTests)
        );
        assert!("commits".parse::<Document>().is_err());
    }

    #[test]
    fn only_test_state_is_mutable() {
        let mutable: Vec<_> = Document::ALL
            .into_iter()
            .filter(|document| document.is_mutable())
            .collect();
        assert_eq!(mutable, vec![Document::TestState]);
        assert_eq!(Document::DeepDiveAnalysis.file_name(), "deep-dive-analysis.json");
    }

    #[test]
    fn project_name_accepts_plain_segments() {
        let name = ProjectName::parse("  pyshop ").expect("valid name");
        assert_eq!(name.as_str(), "pyshop");
        assert!(ProjectName::parse("my-repo.v2").is_ok());
    }

    #[test]
    fn project_name_rejects_path_tricks() {
        assert_eq!(ProjectName::parse(""), Err(ProjectNameError::Empty));
        assert!(matches!(
            ProjectName::parse(".."),
            Err(ProjectNameError::Hidden(_))
        ));
        assert!(matches!(
            ProjectName::parse(".clone-abc"),
            Err(ProjectNameError::Hidden(_))
        ));
        assert!(matches!(
            ProjectName::parse("org/repo"),
            Err(ProjectNameError::InvalidCharacter { found: '/', .. })
        ));
        assert!(matches!(
            ProjectName::parse("a\\b"),
            Err(ProjectNameError::InvalidCharacter { found: '\\', .. })
        ));
        assert_eq!(
            ProjectName::parse(&"x".repeat(MAX_PROJECT_NAME_LEN + 1)),
            Err(ProjectNameError::TooLong)
        );
    }

    #[test]
    fn project_name_deserializes_with_validation() {
        let name: ProjectName = serde_json::from_str("\"pyshop\"").expect("deserialize");
        assert_eq!(name.as_str(), "pyshop");
        assert!(serde_json::from_str::<ProjectName>("\"../etc\"").is_err());
    }
}
