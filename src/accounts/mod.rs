// Remote account listing
mod fetcher;

pub use fetcher::SsoAccountPager;

use crate::error::Result;
use crate::models::Account;

/// Source of SSO accounts, one page at a time.
///
/// `None` ends the listing. A page that failed is reported as `Some(Err(..))` and
/// the caller may keep asking for further pages.
#[allow(async_fn_in_trait)]
pub trait AccountPager {
    async fn next_page(&mut self) -> Option<Result<Vec<Account>>>;
}

/// Drain a pager, logging and skipping failed pages
pub async fn collect_accounts<P: AccountPager>(pager: &mut P) -> Vec<Account> {
    let mut accounts = Vec::new();

    while let Some(page) = pager.next_page().await {
        match page {
            Ok(page) => accounts.extend(page),
            Err(e) => tracing::error!("{}", e),
        }
    }

    accounts
}
