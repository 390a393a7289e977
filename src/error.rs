use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not in a git repository (searched upwards from {0})")]
    NotInRepository(PathBuf),

    #[error("could not find profile for {0}")]
    ProfileNotFound(String),

    #[error("error parsing aws config for profile {profile}: missing key '{key}'")]
    ParseError { profile: String, key: String },

    #[error("could not find terragrunt.hcl at root of git repo {0}")]
    DeclarationNotFound(PathBuf),

    #[error("{}", account_mismatch_message(.profile_account, .declared, .file))]
    AccountMismatch {
        profile_account: String,
        declared: Option<String>,
        file: PathBuf,
    },

    #[error("AWS config file {path} is corrupt (line {line}): {reason}")]
    ConfigFileCorrupt {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("failed to commit {path}: {source}")]
    PersistFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("AWS SDK error: {0}")]
    AwsSdk(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization expired - user took too long to complete device flow")]
    AuthorizationExpired,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

fn account_mismatch_message(
    profile_account: &str,
    declared: &Option<String>,
    file: &std::path::Path,
) -> String {
    match declared {
        Some(_) => format!(
            "account id {} determined from profile did not match entry in terragrunt file {}",
            profile_account,
            file.display()
        ),
        None => format!("could not determine account id from {}", file.display()),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
