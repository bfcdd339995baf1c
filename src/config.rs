//! Configuration loading and management.

use crate::version::FamilyPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Location of the config file relative to the project root
pub const CONFIG_PATH: &str = "wiz/config.toml";

/// Project configuration (wiz/config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
    #[serde(default)]
    pub versioning: VersioningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_project_name")]
    pub name: String,
    /// Creator recorded on new wizards and clones (e.g. "ana")
    #[serde(default = "default_creator")]
    pub default_creator: String,
}

fn default_project_name() -> String {
    "wizctl-project".to_string()
}

fn default_creator() -> String {
    // Try to get git user.name, fall back to placeholder
    std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            default_creator: default_creator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root directory for wizard data (wiz/)
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,
}

fn default_data_root() -> PathBuf {
    PathBuf::from("wiz")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
        }
    }
}

impl PathsConfig {
    /// Wizard aggregates (wiz/wizards/)
    pub fn wizards_dir(&self) -> PathBuf {
        self.data_root.join("wizards")
    }

    /// Run records (wiz/runs/)
    pub fn runs_dir(&self) -> PathBuf {
        self.data_root.join("runs")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Seconds a write command waits for the data root lock
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
}

fn default_lock_timeout() -> u64 {
    30
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersioningConfig {
    #[serde(default)]
    pub family: FamilyPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive used when WIZCTL_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load config from file or use defaults.
    ///
    /// A relative `data_root` is resolved against the directory holding the
    /// `wiz/` folder, so commands work from any subdirectory.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(PathBuf::from)
            .or_else(Self::find_config)
            .unwrap_or_else(|| PathBuf::from(CONFIG_PATH));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse config: {}", config_path.display()))?
        } else {
            Config::default()
        };

        if config.paths.data_root.is_relative() {
            if let Some(project_root) = config_path.parent().and_then(Path::parent) {
                if !project_root.as_os_str().is_empty() {
                    config.paths.data_root = project_root.join(&config.paths.data_root);
                }
            }
        }
        Ok(config)
    }

    /// Find config file by walking up directory tree
    fn find_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let config_path = current.join(CONFIG_PATH);
            if config_path.exists() {
                return Some(config_path);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub fn data_root(&self) -> &Path {
        &self.paths.data_root
    }

    pub fn config_file(&self) -> PathBuf {
        self.paths.data_root.join("config.toml")
    }

    /// Generate default config TOML
    pub fn default_toml() -> &'static str {
        r#"[project]
name = "my-project"
# Creator recorded on new wizards (uses git user.name if not set)
# default_creator = "your-name"

[paths]
data_root = "wiz"

[concurrency]
# Seconds a write command waits for another writer to finish
lock_timeout_secs = 30

[versioning]
# Which wizards share version numbers:
# - lineage: every wizard linked through parent_wizard_id (default)
# - direct: the wizard and its direct children only
family = "lineage"

[logging]
# tracing filter (overridden by WIZCTL_LOG)
level = "warn"
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_toml_parses_to_defaults() {
        let config: Config = toml::from_str(Config::default_toml()).expect("default config parses");
        assert_eq!(config.paths.data_root, PathBuf::from("wiz"));
        assert_eq!(config.concurrency.lock_timeout_secs, 30);
        assert_eq!(config.versioning.family, FamilyPolicy::Lineage);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_direct_family_policy() {
        let config: Config =
            toml::from_str("[versioning]\nfamily = \"direct\"\n").expect("config parses");
        assert_eq!(config.versioning.family, FamilyPolicy::Direct);
    }

    #[test]
    fn test_data_root_resolves_against_project_root() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let wiz = dir.path().join("wiz");
        std::fs::create_dir_all(&wiz).expect("mkdir");
        std::fs::write(wiz.join("config.toml"), Config::default_toml()).expect("write config");

        let config = Config::load(Some(&wiz.join("config.toml"))).expect("load");
        assert_eq!(config.data_root(), dir.path().join("wiz"));
    }
}
