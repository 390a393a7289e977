use super::sso_session;
use crate::config::Config;
use crate::error::Result;

pub async fn execute(config: &Config, headless: bool, force: bool) -> Result<()> {
    let token = sso_session(config, headless, force).await?;

    println!("✓ Login successful!");
    println!("  Token expires in: {}", token.expiration_display());

    Ok(())
}
