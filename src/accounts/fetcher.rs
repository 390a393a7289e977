use super::AccountPager;
use crate::error::{Error, Result};
use crate::models::Account;
use aws_sdk_sso::Client as SsoClient;

/// Consecutive failures of the same page before giving up on the listing
const MAX_PAGE_ATTEMPTS: u32 = 3;

/// Pages through `sso:ListAccounts` for one access token
pub struct SsoAccountPager {
    client: SsoClient,
    access_token: String,
    next_token: Option<String>,
    failures: u32,
    done: bool,
}

impl SsoAccountPager {
    pub async fn new(region: &str, access_token: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: SsoClient::new(&config),
            access_token: access_token.to_string(),
            next_token: None,
            failures: 0,
            done: false,
        }
    }
}

impl AccountPager for SsoAccountPager {
    async fn next_page(&mut self) -> Option<Result<Vec<Account>>> {
        if self.done {
            return None;
        }

        let mut request = self.client.list_accounts().access_token(&self.access_token);
        if let Some(token) = &self.next_token {
            request = request.next_token(token);
        }

        match request.send().await {
            Ok(response) => {
                self.failures = 0;

                let accounts = response
                    .account_list()
                    .iter()
                    .map(|account| {
                        Account::new(
                            account.account_id().unwrap_or(""),
                            account.account_name().unwrap_or(""),
                        )
                    })
                    .collect();

                self.next_token = response.next_token().map(|s| s.to_string());
                if self.next_token.is_none() {
                    self.done = true;
                }

                Some(Ok(accounts))
            }
            Err(e) => {
                // Without a response there is no next token, so the same page is retried
                self.failures += 1;
                if self.failures >= MAX_PAGE_ATTEMPTS {
                    self.done = true;
                }

                Some(Err(Error::AwsSdk(format!("Failed to list accounts: {}", e))))
            }
        }
    }
}
