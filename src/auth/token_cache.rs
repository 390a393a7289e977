use crate::error::{Error, Result};
use crate::models::SsoToken;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::fs;
use std::path::{Path, PathBuf};

/// AWS CLI v1 wrote `2024-01-01T12:00:00UTC` instead of an RFC 3339 offset
const LEGACY_EXPIRY_FORMAT: &str = "%Y-%m-%dT%H:%M:%SUTC";

/// Loose view of a cache file; anything in the directory may be JSON of another shape
#[derive(Debug, Deserialize)]
struct CacheEntry {
    #[serde(rename = "accessToken", default)]
    access_token: String,

    #[serde(rename = "expiresAt", default)]
    expires_at: Option<String>,
}

fn parse_expiry(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, LEGACY_EXPIRY_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Token cache compatible with AWS CLI v2
/// Reads and writes `~/.aws/sso/cache/*.json`
pub struct TokenCache {
    cache_dir: PathBuf,
}

impl TokenCache {
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::home_dir()
            .ok_or_else(|| Error::CacheError("Could not determine home directory".to_string()))?
            .join(".aws")
            .join("sso")
            .join("cache");

        Ok(Self::with_dir(cache_dir))
    }

    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Generate cache key (compatible with AWS CLI v2 legacy SSO profiles)
    fn cache_key(start_url: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(start_url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn cache_file_path(&self, start_url: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", Self::cache_key(start_url)))
    }

    /// First cached access token that has not expired yet.
    ///
    /// Unreadable files, other JSON documents and entries without a token or
    /// expiry are skipped. Files are visited in name order.
    pub fn find_valid_token(&self) -> Option<SsoToken> {
        let entries = match fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!("Cannot read {}: {}", self.cache_dir.display(), e);
                return None;
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
            .collect();
        paths.sort();

        let now = Utc::now();
        for path in paths {
            let Ok(contents) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<CacheEntry>(&contents) else {
                continue;
            };
            if entry.access_token.is_empty() {
                continue;
            }
            let Some(expires_at) = entry.expires_at.as_deref().and_then(parse_expiry) else {
                continue;
            };
            if expires_at <= now {
                tracing::debug!("Skipping expired token in {}", path.display());
                continue;
            }

            tracing::debug!("Using cached token from {}", path.display());
            return Some(SsoToken {
                access_token: entry.access_token,
                expires_at,
                refresh_token: None,
                region: None,
                start_url: None,
            });
        }

        None
    }

    /// Save token to cache under the AWS CLI file name for its start URL
    pub fn save_token(&self, start_url: &str, token: &SsoToken) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir).map_err(|e| {
            Error::CacheError(format!("Failed to create cache directory: {}", e))
        })?;

        let cache_file = self.cache_file_path(start_url);
        let json = serde_json::to_string_pretty(token)?;

        fs::write(&cache_file, json)
            .map_err(|e| Error::CacheError(format!("Failed to write cache file: {}", e)))?;

        Ok(cache_file)
    }
}
