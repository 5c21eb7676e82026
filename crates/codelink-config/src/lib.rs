use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use codelink_core::ProjectName;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "codelink.toml";
pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_PROJECTS_ROOT: &str = "data/projects";
pub const DEFAULT_PROJECT: &str = "pyshop";
pub const DEFAULT_GIT_PROGRAM: &str = "git";
pub const DEFAULT_API_RESPONSE_DELAY_SECS: f64 = 0.3;
pub const DEFAULT_EDGE_CASE_SUBMISSION_DELAY_SECS: f64 = 0.5;
pub const DEFAULT_TEST_STATE_SYNC_DELAY_SECS: f64 = 0.3;

pub const ENV_BIND: &str = "CODELINK_BIND";
pub const ENV_PROJECTS_ROOT: &str = "CODELINK_PROJECTS_ROOT";
pub const ENV_DEFAULT_PROJECT: &str = "DEFAULT_PROJECT";
pub const ENV_API_RESPONSE_DELAY: &str = "API_RESPONSE_DELAY";
pub const ENV_EDGE_CASES_SUBMISSION_DELAY: &str = "EDGE_CASES_SUBMISSION_DELAY";
pub const ENV_TEST_STATE_SYNC_DELAY: &str = "TEST_STATE_SYNC_DELAY";
pub const ENV_ENABLE_DETAILED_LOGGING: &str = "ENABLE_DETAILED_LOGGING";
pub const ENV_GIT_PROGRAM: &str = "CODELINK_GIT";

const LONG_DELAY_WARNING_SECS: f64 = 10.0;
const DELAY_RANGE_REASON: &str = "delay must be a non-negative number of seconds within Duration range";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CodelinkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub delays: DelayConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub git: GitConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_projects_root")]
    pub projects_root: PathBuf,
    #[serde(default = "default_project")]
    pub default_project: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            projects_root: default_projects_root(),
            default_project: default_project(),
        }
    }
}

/// Artificial response delays, in seconds. They only emulate production
/// latency for frontend work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayConfig {
    #[serde(default = "default_api_response_delay")]
    pub api_response_secs: f64,
    #[serde(default = "default_edge_case_submission_delay")]
    pub edge_case_submission_secs: f64,
    #[serde(default = "default_test_state_sync_delay")]
    pub test_state_sync_secs: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            api_response_secs: DEFAULT_API_RESPONSE_DELAY_SECS,
            edge_case_submission_secs: DEFAULT_EDGE_CASE_SUBMISSION_DELAY_SECS,
            test_state_sync_secs: DEFAULT_TEST_STATE_SYNC_DELAY_SECS,
        }
    }
}

impl DelayConfig {
    pub fn none() -> Self {
        Self {
            api_response_secs: 0.0,
            edge_case_submission_secs: 0.0,
            test_state_sync_secs: 0.0,
        }
    }

    pub fn api_response(&self) -> Duration {
        seconds(self.api_response_secs)
    }

    pub fn edge_case_submission(&self) -> Duration {
        seconds(self.edge_case_submission_secs)
    }

    pub fn test_state_sync(&self) -> Duration {
        seconds(self.test_state_sync_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_detailed")]
    pub detailed: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            detailed: default_detailed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_git_program")]
    pub program: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            program: default_git_program(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Builds the effective configuration: defaults, then `path` when it exists,
/// then the process environment.
pub fn load_config(path: Option<&Path>) -> Result<CodelinkConfig, ConfigError> {
    let config = match path {
        Some(path) => load_config_file(path)?,
        None => CodelinkConfig::default(),
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    Ok(normalize_config(config))
}

pub fn load_config_file(path: impl AsRef<Path>) -> Result<CodelinkConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(CodelinkConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: CodelinkConfig = toml::from_str(&raw)?;
    check_delays(&parsed.delays)?;
    Ok(normalize_config(parsed))
}

pub fn apply_env_overrides<F>(
    mut config: CodelinkConfig,
    lookup: F,
) -> Result<CodelinkConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bind) = lookup(ENV_BIND) {
        config.server.bind = bind;
    }
    if let Some(root) = lookup(ENV_PROJECTS_ROOT) {
        config.storage.projects_root = PathBuf::from(root);
    }
    if let Some(project) = lookup(ENV_DEFAULT_PROJECT) {
        config.storage.default_project = project;
    }
    if let Some(raw) = lookup(ENV_API_RESPONSE_DELAY) {
        config.delays.api_response_secs = parse_delay(ENV_API_RESPONSE_DELAY, &raw)?;
    }
    if let Some(raw) = lookup(ENV_EDGE_CASES_SUBMISSION_DELAY) {
        config.delays.edge_case_submission_secs =
            parse_delay(ENV_EDGE_CASES_SUBMISSION_DELAY, &raw)?;
    }
    if let Some(raw) = lookup(ENV_TEST_STATE_SYNC_DELAY) {
        config.delays.test_state_sync_secs = parse_delay(ENV_TEST_STATE_SYNC_DELAY, &raw)?;
    }
    if let Some(raw) = lookup(ENV_ENABLE_DETAILED_LOGGING) {
        config.logging.detailed = raw.trim().eq_ignore_ascii_case("true");
    }
    if let Some(program) = lookup(ENV_GIT_PROGRAM) {
        config.git.program = program;
    }

    Ok(normalize_config(config))
}

pub fn validate_config(config: &CodelinkConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if let Err(err) = ProjectName::parse(&config.storage.default_project) {
        warnings.push(ConfigWarning {
            code: "default_project_invalid",
            message: format!(
                "storage.default_project '{}' is not a usable project name: {err}",
                config.storage.default_project
            ),
        });
    }

    let delays = [
        ("delays.api_response_secs", config.delays.api_response_secs),
        (
            "delays.edge_case_submission_secs",
            config.delays.edge_case_submission_secs,
        ),
        ("delays.test_state_sync_secs", config.delays.test_state_sync_secs),
    ];
    for (key, value) in delays {
        if value > LONG_DELAY_WARNING_SECS {
            warnings.push(ConfigWarning {
                code: "delay_unusually_long",
                message: format!("{key} is {value}s; every matching request will wait that long"),
            });
        }
    }

    if config.server.bind.parse::<std::net::SocketAddr>().is_err() {
        warnings.push(ConfigWarning {
            code: "bind_unparseable",
            message: format!(
                "server.bind '{}' is not a socket address; the server will fail to start",
                config.server.bind
            ),
        });
    }

    warnings
}

fn parse_delay(key: &'static str, raw: &str) -> Result<f64, ConfigError> {
    let value: f64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_owned(),
        reason: "expected a number of seconds",
    })?;

    if Duration::try_from_secs_f64(value).is_err() {
        return Err(ConfigError::InvalidValue {
            key,
            value: raw.to_owned(),
            reason: DELAY_RANGE_REASON,
        });
    }

    Ok(value)
}

fn check_delays(delays: &DelayConfig) -> Result<(), ConfigError> {
    let values = [
        ("delays.api_response_secs", delays.api_response_secs),
        (
            "delays.edge_case_submission_secs",
            delays.edge_case_submission_secs,
        ),
        ("delays.test_state_sync_secs", delays.test_state_sync_secs),
    ];
    for (key, value) in values {
        if Duration::try_from_secs_f64(value).is_err() {
            return Err(ConfigError::InvalidValue {
                key,
                value: value.to_string(),
                reason: DELAY_RANGE_REASON,
            });
        }
    }
    Ok(())
}

fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn default_bind() -> String {
    DEFAULT_BIND.to_owned()
}

fn default_projects_root() -> PathBuf {
    PathBuf::from(DEFAULT_PROJECTS_ROOT)
}

fn default_project() -> String {
    DEFAULT_PROJECT.to_owned()
}

fn default_api_response_delay() -> f64 {
    DEFAULT_API_RESPONSE_DELAY_SECS
}

fn default_edge_case_submission_delay() -> f64 {
    DEFAULT_EDGE_CASE_SUBMISSION_DELAY_SECS
}

fn default_test_state_sync_delay() -> f64 {
    DEFAULT_TEST_STATE_SYNC_DELAY_SECS
}

fn default_detailed() -> bool {
    true
}

fn default_git_program() -> String {
    DEFAULT_GIT_PROGRAM.to_owned()
}

fn normalize_config(mut config: CodelinkConfig) -> CodelinkConfig {
    config.server.bind = config.server.bind.trim().to_owned();
    if config.server.bind.is_empty() {
        config.server.bind = default_bind();
    }

    let project = config.storage.default_project.trim();
    if project.is_empty() {
        config.storage.default_project = default_project();
    } else {
        config.storage.default_project = project.to_owned();
    }

    let program = config.git.program.trim();
    if program.is_empty() {
        config.git.program = default_git_program();
    } else {
        config.git.program = program.to_owned();
    }

    config
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = CodelinkConfig::default();

        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.storage.default_project, "pyshop");
        assert_eq!(config.storage.projects_root, PathBuf::from("data/projects"));
        assert_eq!(config.delays.api_response(), Duration::from_millis(300));
        assert_eq!(config.delays.edge_case_submission(), Duration::from_millis(500));
        assert!(config.logging.detailed);
        assert_eq!(config.git.program, "git");
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_config_file(temp.path().join(CONFIG_FILE_NAME)).expect("load config");
        assert_eq!(config, CodelinkConfig::default());
    }

    #[test]
    fn load_config_file_parses_sections() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);

        let raw = r#"
[server]
bind = "127.0.0.1:9000"

[storage]
projects_root = "/srv/codelink/projects"
default_project = "  shopfront  "

[delays]
api_response_secs = 0.0
"#;
        fs::write(&path, raw).expect("write config");

        let config = load_config_file(&path).expect("load config");

        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(
            config.storage.projects_root,
            PathBuf::from("/srv/codelink/projects")
        );
        assert_eq!(config.storage.default_project, "shopfront");
        assert_eq!(config.delays.api_response(), Duration::ZERO);
        assert_eq!(
            config.delays.test_state_sync_secs,
            DEFAULT_TEST_STATE_SYNC_DELAY_SECS
        );
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let lookup = lookup_from(&[
            (ENV_API_RESPONSE_DELAY, "1.5"),
            (ENV_ENABLE_DETAILED_LOGGING, "FALSE"),
            (ENV_DEFAULT_PROJECT, "webshop"),
            (ENV_PROJECTS_ROOT, "/tmp/projects"),
        ]);

        let config =
            apply_env_overrides(CodelinkConfig::default(), lookup).expect("apply overrides");

        assert_eq!(config.delays.api_response(), Duration::from_millis(1500));
        assert!(!config.logging.detailed);
        assert_eq!(config.storage.default_project, "webshop");
        assert_eq!(config.storage.projects_root, PathBuf::from("/tmp/projects"));
    }

    #[test]
    fn detailed_logging_only_accepts_true() {
        for (raw, expected) in [("true", true), ("True", true), ("yes", false), ("1", false)] {
            let lookup = lookup_from(&[(ENV_ENABLE_DETAILED_LOGGING, raw)]);
            let config =
                apply_env_overrides(CodelinkConfig::default(), lookup).expect("apply overrides");
            assert_eq!(config.logging.detailed, expected, "value {raw}");
        }
    }

    #[test]
    fn invalid_delay_is_rejected() {
        let lookup = lookup_from(&[(ENV_TEST_STATE_SYNC_DELAY, "soon")]);
        let err = apply_env_overrides(CodelinkConfig::default(), lookup).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_TEST_STATE_SYNC_DELAY,
                ..
            }
        ));

        let lookup = lookup_from(&[(ENV_API_RESPONSE_DELAY, "-1")]);
        assert!(apply_env_overrides(CodelinkConfig::default(), lookup).is_err());
    }

    #[test]
    fn env_delay_beyond_duration_range_is_rejected() {
        let lookup = lookup_from(&[(ENV_API_RESPONSE_DELAY, "1e20")]);
        let err = apply_env_overrides(CodelinkConfig::default(), lookup).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: ENV_API_RESPONSE_DELAY,
                ..
            }
        ));
    }

    #[test]
    fn file_delays_are_range_checked() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE_NAME);

        fs::write(&path, "[delays]\napi_response_secs = -5.0\n").expect("write config");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "delays.api_response_secs",
                ..
            }
        ));

        fs::write(&path, "[delays]\nedge_case_submission_secs = 1e300\n").expect("write config");
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "delays.edge_case_submission_secs",
                ..
            }
        ));
    }

    #[test]
    fn out_of_range_delay_never_panics() {
        let delays = DelayConfig {
            api_response_secs: 1e300,
            edge_case_submission_secs: -5.0,
            test_state_sync_secs: f64::NAN,
        };
        assert_eq!(delays.api_response(), Duration::ZERO);
        assert_eq!(delays.edge_case_submission(), Duration::ZERO);
        assert_eq!(delays.test_state_sync(), Duration::ZERO);
    }

    #[test]
    fn blank_default_project_falls_back() {
        let lookup = lookup_from(&[(ENV_DEFAULT_PROJECT, "   ")]);
        let config =
            apply_env_overrides(CodelinkConfig::default(), lookup).expect("apply overrides");
        assert_eq!(config.storage.default_project, DEFAULT_PROJECT);
    }

    #[test]
    fn validate_config_flags_bad_values() {
        let mut config = CodelinkConfig::default();
        assert!(validate_config(&config).is_empty());

        config.storage.default_project = "../escape".to_owned();
        config.delays.edge_case_submission_secs = 30.0;
        config.server.bind = "localhost".to_owned();

        let codes: Vec<_> = validate_config(&config)
            .into_iter()
            .map(|warning| warning.code)
            .collect();
        assert_eq!(
            codes,
            vec![
                "default_project_invalid",
                "delay_unusually_long",
                "bind_unparseable"
            ]
        );
    }
}
