use super::sso_session;
use crate::accounts::SsoAccountPager;
use crate::config::Config;
use crate::error::Result;
use crate::reconcile::{AccountPolicy, ReconcileOptions, Reconciler};

pub async fn execute(config: &Config, headless: bool, diff: bool, cleanup: bool) -> Result<()> {
    // Fail on missing settings before anyone is asked to log in
    let defaults = config.profile_defaults()?;
    let path = config.aws_config_file()?;

    let token = sso_session(config, headless, false).await?;
    let mut pager = SsoAccountPager::new(&config.sso.region, &token.access_token).await;

    let reconciler = Reconciler::new(AccountPolicy::from(&config.accounts), defaults)
        .with_retired(config.accounts.retired.clone());
    let report = reconciler
        .run(&path, &mut pager, ReconcileOptions { cleanup, diff })
        .await?;

    if report.failed_pages > 0 {
        tracing::warn!(
            "{} page(s) of the account list could not be fetched; their profiles were not refreshed",
            report.failed_pages
        );
    }
    println!(
        "✓ {}: {} added, {} refreshed, {} removed, {} skipped",
        path.display(),
        report.added.len(),
        report.refreshed,
        report.removed.len(),
        report.skipped
    );

    Ok(())
}
