// AWS SSO OIDC authentication module
mod oidc;
mod token_cache;

pub use oidc::{DeviceFlow, OidcClient};
pub use token_cache::TokenCache;

use crate::error::Result;
use crate::models::SsoToken;

/// High-level authentication interface
pub struct AuthManager {
    token_cache: TokenCache,
}

impl AuthManager {
    pub fn new() -> Result<Self> {
        Ok(Self::with_cache(TokenCache::new()?))
    }

    pub fn with_cache(token_cache: TokenCache) -> Self {
        Self { token_cache }
    }

    /// Get cached token if one is still valid
    pub fn get_cached_token(&self) -> Option<SsoToken> {
        self.token_cache.find_valid_token()
    }

    /// Return a usable access token, running the device flow when the cache has none
    pub async fn get_token<F: DeviceFlow>(
        &self,
        flow: &F,
        start_url: &str,
        force_refresh: bool,
    ) -> Result<SsoToken> {
        if !force_refresh {
            if let Some(token) = self.get_cached_token() {
                return Ok(token);
            }
            tracing::debug!(
                "No valid token in {}, starting device authorization",
                self.token_cache.cache_dir().display()
            );
        }

        let token = flow.authorize(start_url).await?;

        // Failing to cache only costs a login next time
        match self.token_cache.save_token(start_url, &token) {
            Ok(path) => tracing::debug!("Cached token at {}", path.display()),
            Err(e) => tracing::warn!("{}", e),
        }

        Ok(token)
    }
}
