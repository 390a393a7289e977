pub mod completions;
pub mod config;
pub mod generate;
pub mod list;
pub mod login;
pub mod resolve;
pub mod run;

use crate::auth::{AuthManager, OidcClient};
use crate::config::Config;
use crate::env;
use crate::error::Result;
use crate::models::SsoToken;

/// Cached token, or a new one from the device flow
async fn sso_session(config: &Config, headless: bool, force: bool) -> Result<SsoToken> {
    let start_url = config.start_url()?;
    let auth = AuthManager::new()?;
    let flow = OidcClient::new(&config.sso.region, env::is_headless_environment(headless)).await?;

    auth.get_token(&flow, start_url, force).await
}
