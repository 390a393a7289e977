// Configuration management
use crate::error::{Error, Result};
use crate::models::ProfileDefaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR: &str = "aws-sso-config";
const ENV_PREFIX: &str = "AWS_SSO_CONFIG_";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub sso: SsoConfig,
    #[serde(default)]
    pub aws: AwsSettings,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub run: RunConfig,
    /// Repository name -> profile name, for repositories not named after their account
    #[serde(default)]
    pub repo_profiles: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SsoConfig {
    pub start_url: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_role")]
    pub role: String,
}

impl Default for SsoConfig {
    fn default() -> Self {
        Self {
            start_url: None,
            region: default_region(),
            role: default_role(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AwsSettings {
    #[serde(default = "default_region")]
    pub default_region: String,
    pub config_file: Option<PathBuf>,
}

impl Default for AwsSettings {
    fn default() -> Self {
        Self {
            default_region: default_region(),
            config_file: None,
        }
    }
}

/// Which SSO accounts become profiles, and under what name
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AccountsConfig {
    /// Only accounts whose name starts with one of these; empty means all accounts
    #[serde(default)]
    pub include_prefixes: Vec<String>,
    /// Removed from the account name, in order, to form the profile name
    #[serde(default)]
    pub strip_prefixes: Vec<String>,
    /// Account ids of closed accounts, pruned by `generate --cleanup`
    #[serde(default)]
    pub retired: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default = "default_wrapper")]
    pub wrapper: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            wrapper: default_wrapper(),
        }
    }
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_role() -> String {
    "AdministratorAccess".to_string()
}

fn default_wrapper() -> String {
    "aws2-wrap".to_string()
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

/// Keys addressable through `config get/set/unset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SsoStartUrl,
    SsoRegion,
    SsoRole,
    DefaultRegion,
    ConfigFile,
    Wrapper,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 6] = [
        ConfigKey::SsoStartUrl,
        ConfigKey::SsoRegion,
        ConfigKey::SsoRole,
        ConfigKey::DefaultRegion,
        ConfigKey::ConfigFile,
        ConfigKey::Wrapper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::SsoStartUrl => "sso.start_url",
            ConfigKey::SsoRegion => "sso.region",
            ConfigKey::SsoRole => "sso.role",
            ConfigKey::DefaultRegion => "aws.default_region",
            ConfigKey::ConfigFile => "aws.config_file",
            ConfigKey::Wrapper => "run.wrapper",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConfigKey::SsoStartUrl => "Your AWS SSO start URL",
            ConfigKey::SsoRegion => "AWS region for SSO (e.g., us-east-1)",
            ConfigKey::SsoRole => "SSO role name (e.g., AdministratorAccess)",
            ConfigKey::DefaultRegion => "Default AWS region for profiles",
            ConfigKey::ConfigFile => "Path to AWS config file",
            ConfigKey::Wrapper => "Credential wrapper executed by `run`",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| Error::ConfigError(format!("Invalid configuration key: {}", s)))
    }
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/aws-sso-config (if env var is set)
    /// 2. ~/.config/aws-sso-config (if ~/.config exists)
    /// 3. ~/.aws-sso-config (fallback on Unix, doesn't create ~/.config)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join(APP_DIR));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");

                if xdg_config.exists() {
                    return Ok(xdg_config.join(APP_DIR));
                }

                return Ok(home_dir.join(format!(".{}", APP_DIR)));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join(APP_DIR));
            }
        }

        Err(Error::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    /// Get the config file path
    pub fn default_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, environment variables, and defaults.
    ///
    /// An explicit path must exist; the default location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None => {
                let path = Self::default_file_path()?;
                if path.exists() {
                    Self::load_file(&path)?
                } else {
                    tracing::debug!("Config file not found at {}, using defaults", path.display());
                    Config::default()
                }
            }
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from: {}", path.display());
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(toml::from_str(&contents)?)
    }

    /// Override values from `AWS_SSO_CONFIG_*` variables
    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |suffix: &str| {
            let name = format!("{}{}", ENV_PREFIX, suffix);
            let value = lookup(&name).filter(|v| !v.is_empty());
            if let Some(v) = &value {
                tracing::debug!("Using {} from environment: {}", name, v);
            }
            value
        };

        if let Some(v) = env("SSO_START_URL") {
            self.sso.start_url = Some(v);
        }
        if let Some(v) = env("SSO_REGION") {
            self.sso.region = v;
        }
        if let Some(v) = env("SSO_ROLE") {
            self.sso.role = v;
        }
        if let Some(v) = env("DEFAULT_REGION") {
            self.aws.default_region = v;
        }
        if let Some(v) = env("CONFIG_FILE") {
            self.aws.config_file = Some(PathBuf::from(v));
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    Error::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
                tracing::info!("Created config directory: {}", dir.display());
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| Error::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::debug!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Create a sample config file with comments
    pub fn create_sample(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::ConfigError(format!(
                "Config file already exists at: {}",
                path.display()
            )));
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let sample_config = r#"# aws-sso-config configuration
# Location priority:
#   1. $XDG_CONFIG_HOME/aws-sso-config/config.toml (if XDG_CONFIG_HOME is set)
#   2. ~/.config/aws-sso-config/config.toml (if ~/.config exists)
#   3. ~/.aws-sso-config/config.toml (fallback)
#
# Environment variables override the file:
#   AWS_SSO_CONFIG_SSO_START_URL
#   AWS_SSO_CONFIG_SSO_REGION
#   AWS_SSO_CONFIG_SSO_ROLE
#   AWS_SSO_CONFIG_DEFAULT_REGION
#   AWS_SSO_CONFIG_CONFIG_FILE

[sso]
# Your AWS SSO start URL (required)
# Example: start_url = "https://my-org.awsapps.com/start"
start_url = ""
region = "us-east-1"
role = "AdministratorAccess"

[aws]
# Region written as `region` into every generated profile
default_region = "us-east-1"
config_file = "~/.aws/config"

[accounts]
# Only generate profiles for accounts whose name starts with one of these.
# Empty list: every account.
# Example: include_prefixes = ["trip-", "tripadvisor-", "core-"]
include_prefixes = []

# Prefixes removed from the account name to form the profile name.
# Example: strip_prefixes = ["trip-", "tripadvisor-"]
strip_prefixes = []

# Ids of closed accounts; `generate --cleanup` removes their profiles.
retired = []

[run]
wrapper = "aws2-wrap"

[repo_profiles]
# Repositories whose name is not the profile name.
# commerce-prod = "commerce-prd"
"#;

        fs::write(path, sample_config)
            .map_err(|e| Error::ConfigError(format!("Failed to write sample config: {}", e)))?;

        Ok(())
    }

    /// SSO start URL, which has no usable default
    pub fn start_url(&self) -> Result<&str> {
        self.sso
            .start_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                Error::ConfigError(
                    "SSO start_url not configured. Set it with `aws-sso-config config set sso.start_url <url>` \
                     or the AWS_SSO_CONFIG_SSO_START_URL environment variable"
                        .to_string(),
                )
            })
    }

    /// Path of the AWS config file to read and rewrite
    pub fn aws_config_file(&self) -> Result<PathBuf> {
        match &self.aws.config_file {
            Some(path) if !path.as_os_str().is_empty() => Ok(expand_home(path)),
            _ => crate::aws_config::default_config_file_path(),
        }
    }

    /// Values written into every generated profile
    pub fn profile_defaults(&self) -> Result<ProfileDefaults> {
        Ok(ProfileDefaults {
            role_name: self.sso.role.clone(),
            sso_region: self.sso.region.clone(),
            sso_start_url: self.start_url()?.to_string(),
            region: self.aws.default_region.clone(),
        })
    }

    pub fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::SsoStartUrl => self.sso.start_url.clone().unwrap_or_default(),
            ConfigKey::SsoRegion => self.sso.region.clone(),
            ConfigKey::SsoRole => self.sso.role.clone(),
            ConfigKey::DefaultRegion => self.aws.default_region.clone(),
            ConfigKey::ConfigFile => self
                .aws
                .config_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ConfigKey::Wrapper => self.run.wrapper.clone(),
        }
    }

    pub fn set(&mut self, key: ConfigKey, value: &str) {
        let value = value.to_string();
        match key {
            ConfigKey::SsoStartUrl => self.sso.start_url = Some(value),
            ConfigKey::SsoRegion => self.sso.region = value,
            ConfigKey::SsoRole => self.sso.role = value,
            ConfigKey::DefaultRegion => self.aws.default_region = value,
            ConfigKey::ConfigFile => self.aws.config_file = Some(PathBuf::from(value)),
            ConfigKey::Wrapper => self.run.wrapper = value,
        }
    }

    /// Reset a key to its default
    pub fn unset(&mut self, key: ConfigKey) {
        let defaults = Config::default();
        match key {
            ConfigKey::SsoStartUrl => self.sso.start_url = defaults.sso.start_url,
            ConfigKey::SsoRegion => self.sso.region = defaults.sso.region,
            ConfigKey::SsoRole => self.sso.role = defaults.sso.role,
            ConfigKey::DefaultRegion => self.aws.default_region = defaults.aws.default_region,
            ConfigKey::ConfigFile => self.aws.config_file = defaults.aws.config_file,
            ConfigKey::Wrapper => self.run.wrapper = defaults.run.wrapper,
        }
    }
}
