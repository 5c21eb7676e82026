use std::ffi::OsStr;
use std::path::PathBuf;

use clap::Parser;
use codelink_config::{CONFIG_FILE_NAME, CodelinkConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Json => "json",
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "invalid log format '{other}', expected one of: human, json"
            )),
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about = "CodeLink analysis API server")]
pub struct Cli {
    #[arg(
        long,
        default_value = CONFIG_FILE_NAME,
        help = "TOML config file; missing files fall back to defaults"
    )]
    pub config: PathBuf,

    #[arg(long, help = "Address to listen on, e.g. 0.0.0.0:8000")]
    pub bind: Option<String>,

    #[arg(long, help = "Directory holding one subdirectory per project")]
    pub projects_root: Option<PathBuf>,

    #[arg(long, help = "Project served when a request names none")]
    pub default_project: Option<String>,

    #[arg(
        long,
        default_value = "human",
        value_parser = parse_log_format,
        help = "Log output format: human or json"
    )]
    pub log_format: LogFormat,
}

impl Cli {
    /// Flags win over the environment and the config file.
    pub fn apply_overrides(&self, mut config: CodelinkConfig) -> CodelinkConfig {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(root) = &self.projects_root {
            config.storage.projects_root = root.clone();
        }
        if let Some(project) = &self.default_project {
            config.storage.default_project = project.clone();
        }
        config
    }
}

pub fn parse_cli() -> Cli {
    let mut args: Vec<_> = std::env::args_os().collect();
    if args.get(1).is_some_and(|arg| arg == OsStr::new("--")) {
        args.remove(1);
    }

    Cli::parse_from(args)
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse()
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use clap::Parser;
    use codelink_config::CodelinkConfig;

    use super::{Cli, LogFormat};

    #[test]
    fn defaults_parse_without_flags() {
        let cli = Cli::try_parse_from(["codelinkd"]).expect("no flags should parse");

        assert_eq!(cli.config, Path::new("codelink.toml"));
        assert_eq!(cli.log_format, LogFormat::Human);
        assert!(cli.bind.is_none());
        assert!(cli.projects_root.is_none());
        assert!(cli.default_project.is_none());
    }

    #[test]
    fn flags_override_loaded_config() {
        let cli = Cli::try_parse_from([
            "codelinkd",
            "--bind",
            "127.0.0.1:9000",
            "--projects-root",
            "/srv/codelink",
            "--default-project",
            "webshop",
            "--log-format",
            "json",
        ])
        .expect("all flags should parse");
        assert_eq!(cli.log_format.as_str(), "json");

        let config = cli.apply_overrides(CodelinkConfig::default());
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.storage.projects_root, Path::new("/srv/codelink"));
        assert_eq!(config.storage.default_project, "webshop");
    }

    #[test]
    fn unset_flags_keep_config_values() {
        let cli = Cli::try_parse_from(["codelinkd"]).expect("no flags should parse");
        let mut config = CodelinkConfig::default();
        config.storage.default_project = "pyshop".to_owned();

        let config = cli.apply_overrides(config);
        assert_eq!(config.storage.default_project, "pyshop");
    }

    #[test]
    fn unknown_log_format_is_rejected() {
        let err = Cli::try_parse_from(["codelinkd", "--log-format", "yaml"])
            .expect_err("yaml is not a log format");
        assert!(err.to_string().contains("expected one of: human, json"));
    }
}
