use super::sso_session;
use crate::accounts::{collect_accounts, SsoAccountPager};
use crate::cli::ListFormat;
use crate::config::Config;
use crate::error::Result;
use crate::models::Account;
use crate::reconcile::AccountPolicy;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ListedAccount {
    account_id: String,
    account_name: String,
    /// `None` when the account policy excludes the account
    profile: Option<String>,
}

fn listing(accounts: Vec<Account>, policy: &AccountPolicy) -> Vec<ListedAccount> {
    accounts
        .into_iter()
        .map(|account| {
            let profile = policy
                .includes(&account)
                .then(|| policy.profile_name(&account));
            ListedAccount {
                account_id: account.account_id,
                account_name: account.account_name,
                profile,
            }
        })
        .collect()
}

pub async fn execute(config: &Config, headless: bool, format: ListFormat) -> Result<()> {
    let token = sso_session(config, headless, false).await?;
    let mut pager = SsoAccountPager::new(&config.sso.region, &token.access_token).await;

    let mut accounts = collect_accounts(&mut pager).await;
    accounts.sort_by(|a, b| a.account_name.cmp(&b.account_name));
    let listed = listing(accounts, &AccountPolicy::from(&config.accounts));

    match format {
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&listed)?),
        ListFormat::Text => {
            println!("Available accounts:\n");
            for account in &listed {
                match &account.profile {
                    Some(profile) => println!(
                        "  {} ({}): {}",
                        account.account_name, account.account_id, profile
                    ),
                    None => println!("* {} ({})", account.account_name, account.account_id),
                }
            }
            if listed.iter().any(|a| a.profile.is_none()) {
                println!("\n* not selected by accounts.include_prefixes");
            }
        }
    }

    Ok(())
}
