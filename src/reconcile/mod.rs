// Merge the SSO account list into the AWS config file.
//
// Every qualifying account gets a `[profile <name>]` section whose five SSO keys are
// rewritten on each run; everything else in the file is left alone. The result is
// staged next to the original as `<path>.new` and renamed over it.
use crate::accounts::AccountPager;
use crate::aws_config::{profile_section, AwsConfigFile};
use crate::config::AccountsConfig;
use crate::error::{Error, Result};
use crate::models::{Account, ProfileDefaults};
use crate::process;
use crate::profile::ACCOUNT_ID_KEY;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Which accounts become profiles and what they are called.
///
/// The default takes every account and uses its name verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPolicy {
    include_prefixes: Vec<String>,
    strip_prefixes: Vec<String>,
}

impl AccountPolicy {
    pub fn new(include_prefixes: Vec<String>, strip_prefixes: Vec<String>) -> Self {
        Self {
            include_prefixes,
            strip_prefixes,
        }
    }

    pub fn includes(&self, account: &Account) -> bool {
        self.include_prefixes.is_empty()
            || self
                .include_prefixes
                .iter()
                .any(|prefix| account.account_name.starts_with(prefix.as_str()))
    }

    /// Strip each configured prefix in turn
    pub fn profile_name(&self, account: &Account) -> String {
        self.strip_prefixes
            .iter()
            .fold(account.account_name.as_str(), |name, prefix| {
                name.strip_prefix(prefix.as_str()).unwrap_or(name)
            })
            .to_string()
    }
}

impl From<&AccountsConfig> for AccountPolicy {
    fn from(accounts: &AccountsConfig) -> Self {
        Self::new(
            accounts.include_prefixes.clone(),
            accounts.strip_prefixes.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Remove sections of retired accounts
    pub cleanup: bool,
    /// Show a diff of the staged file before committing it
    pub diff: bool,
}

/// What a run changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: Vec<String>,
    pub refreshed: usize,
    pub skipped: usize,
    pub removed: Vec<String>,
    pub failed_pages: usize,
}

pub struct Reconciler {
    policy: AccountPolicy,
    defaults: ProfileDefaults,
    retired: Vec<String>,
}

impl Reconciler {
    pub fn new(policy: AccountPolicy, defaults: ProfileDefaults) -> Self {
        Self {
            policy,
            defaults,
            retired: Vec::new(),
        }
    }

    pub fn with_retired(mut self, retired: Vec<String>) -> Self {
        self.retired = retired;
        self
    }

    /// Load `path`, merge every page from `pager`, optionally prune, then commit
    pub async fn run<P: AccountPager>(
        &self,
        path: &Path,
        pager: &mut P,
        options: ReconcileOptions,
    ) -> Result<ReconcileReport> {
        let mut config = AwsConfigFile::load(path)?;

        tracing::info!("Fetching list of all accounts for user");
        let mut report = self.merge_accounts(&mut config, pager).await;

        if options.cleanup {
            report.removed = self.prune(&mut config);
        }

        commit(&config, path, options.diff)?;
        Ok(report)
    }

    pub async fn merge_accounts<P: AccountPager>(
        &self,
        config: &mut AwsConfigFile,
        pager: &mut P,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        while let Some(page) = pager.next_page().await {
            let accounts = match page {
                Ok(accounts) => accounts,
                Err(e) => {
                    tracing::error!("{}", e);
                    report.failed_pages += 1;
                    continue;
                }
            };

            for account in accounts {
                if !self.policy.includes(&account) {
                    report.skipped += 1;
                    continue;
                }

                let name = self.policy.profile_name(&account);
                if name.is_empty() {
                    tracing::warn!(
                        "Account {} ({}) has no usable profile name, skipping",
                        account.account_id,
                        account.account_name
                    );
                    report.skipped += 1;
                    continue;
                }

                let section = profile_section(&name);
                // a later account mapping to the same profile overwrites it
                if config.has_section(&section) {
                    if let Some(previous) = config.get(&section, ACCOUNT_ID_KEY) {
                        if previous != account.account_id {
                            tracing::warn!(
                                "Profile {} pointed at account {}, now {}",
                                name,
                                previous,
                                account.account_id
                            );
                        }
                    }
                    report.refreshed += 1;
                } else {
                    tracing::info!("Adding profile {}", name);
                    report.added.push(name.clone());
                }
                self.write_profile(config, &section, &account);
            }
        }

        report
    }

    fn write_profile(&self, config: &mut AwsConfigFile, section: &str, account: &Account) {
        let section = config.add_section(section);
        section.set(ACCOUNT_ID_KEY, &account.account_id);
        section.set("sso_role_name", &self.defaults.role_name);
        section.set("sso_region", &self.defaults.sso_region);
        section.set("sso_start_url", &self.defaults.sso_start_url);
        section.set("region", &self.defaults.region);
    }

    /// Remove every section belonging to a retired account, touched this run or not
    pub fn prune(&self, config: &mut AwsConfigFile) -> Vec<String> {
        let removed = config.retain_sections(|section| {
            section
                .get(ACCOUNT_ID_KEY)
                .map_or(true, |id| !self.retired.iter().any(|r| r == id))
        });

        for name in &removed {
            tracing::info!("Removing [{}] for retired account", name);
        }
        removed
    }
}

/// `<path>.new`
pub fn staged_path(path: &Path) -> PathBuf {
    let mut staged: OsString = path.as_os_str().to_owned();
    staged.push(".new");
    PathBuf::from(staged)
}

/// Write `config` to `<path>.new`, optionally diff it, then rename it over `path`.
///
/// If the rename fails the staged file is left where it is.
pub fn commit(config: &AwsConfigFile, path: &Path, diff: bool) -> Result<()> {
    let staged = staged_path(path);

    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(|source| Error::PersistFailure {
                path: dir.to_path_buf(),
                source,
            })?;
        }
    }

    config
        .save(&staged)
        .map_err(|source| Error::PersistFailure {
            path: staged.clone(),
            source,
        })?;

    // Keep the original mode; ~/.aws/config is often 0600
    if let Ok(metadata) = fs::metadata(path) {
        if metadata.is_file() {
            if let Err(e) = fs::set_permissions(&staged, metadata.permissions()) {
                tracing::debug!("Could not copy permissions to {}: {}", staged.display(), e);
            }
        }
    }

    if diff {
        process::show_diff(path, &staged);
    }

    fs::rename(&staged, path).map_err(|source| {
        tracing::error!(
            "Could not replace {}; the new version is kept at {}",
            path.display(),
            staged.display()
        );
        Error::PersistFailure {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::testing::FakePager;

    const EXISTING: &str = "\
[default]
region=us-west-2
output=json

# hand-written, must survive
[profile legacy]
role_arn = arn:aws:iam::000000000000:role/Admin
source_profile = default

[profile payments]
sso_account_id = 111111111111
sso_role_name = ReadOnly
sso_region = us-east-1
sso_start_url = https://corp.awsapps.com/start
region = us-east-1
output = table

[profile closed]
sso_account_id = 999999999999
sso_role_name = AdministratorAccess
";

    fn defaults() -> ProfileDefaults {
        ProfileDefaults {
            role_name: "AdministratorAccess".to_string(),
            sso_region: "us-east-1".to_string(),
            sso_start_url: "https://corp.awsapps.com/start".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    fn remote_accounts() -> Vec<Option<Vec<Account>>> {
        vec![
            Some(vec![
                Account::new("111111111111", "payments"),
                Account::new("222222222222", "search"),
            ]),
            Some(vec![Account::new("333333333333", "data-lake")]),
        ]
    }

    fn write_config(body: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, body).unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_adds_and_refreshes_profiles() {
        let (_dir, path) = write_config(EXISTING);
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults());

        let report = reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(report.added, vec!["search", "data-lake"]);
        assert_eq!(report.refreshed, 1);
        assert!(report.removed.is_empty());

        let config = AwsConfigFile::load(&path).unwrap();
        assert_eq!(
            config.get("profile payments", "sso_role_name"),
            Some("AdministratorAccess")
        );
        // keys we do not manage are kept
        assert_eq!(config.get("profile payments", "output"), Some("table"));
        assert_eq!(
            config.get("profile data-lake", "sso_account_id"),
            Some("333333333333")
        );
        assert_eq!(
            config.get("profile search", "sso_start_url"),
            Some("https://corp.awsapps.com/start")
        );

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(
            "[default]\nregion=us-west-2\noutput=json\n\n# hand-written, must survive\n[profile legacy]\n"
        ));
        assert!(text.ends_with(
            "[profile data-lake]\nsso_account_id = 333333333333\nsso_role_name = AdministratorAccess\nsso_region = us-east-1\nsso_start_url = https://corp.awsapps.com/start\nregion = us-east-1\n"
        ));
        assert!(!staged_path(&path).exists());
    }

    #[tokio::test]
    async fn test_second_run_is_byte_identical() {
        let (_dir, path) = write_config(EXISTING);
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults());

        reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), ReconcileOptions::default())
            .await
            .unwrap();
        let first = fs::read(&path).unwrap();

        let report = reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), ReconcileOptions::default())
            .await
            .unwrap();
        let second = fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert!(report.added.is_empty());
        assert_eq!(report.refreshed, 3);
    }

    #[tokio::test]
    async fn test_cleanup_removes_retired_accounts() {
        let (_dir, path) = write_config(EXISTING);
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults())
            .with_retired(vec!["999999999999".to_string(), "222222222222".to_string()]);
        let options = ReconcileOptions {
            cleanup: true,
            diff: false,
        };

        let report = reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), options)
            .await
            .unwrap();

        // "search" was just added from the listing and is still retired
        assert_eq!(report.removed, vec!["profile closed", "profile search"]);

        let config = AwsConfigFile::load(&path).unwrap();
        assert!(config
            .sections()
            .all(|s| s.get(ACCOUNT_ID_KEY) != Some("999999999999")
                && s.get(ACCOUNT_ID_KEY) != Some("222222222222")));
        assert!(config.has_section("profile legacy"));
    }

    #[tokio::test]
    async fn test_without_cleanup_retired_sections_stay() {
        let (_dir, path) = write_config(EXISTING);
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults())
            .with_retired(vec!["999999999999".to_string()]);

        reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), ReconcileOptions::default())
            .await
            .unwrap();

        assert!(AwsConfigFile::load(&path)
            .unwrap()
            .has_section("profile closed"));
    }

    #[tokio::test]
    async fn test_failed_page_contributes_nothing() {
        let (_dir, path) = write_config("");
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults());
        let mut pager = FakePager::new(vec![
            Some(vec![Account::new("111111111111", "payments")]),
            None,
            Some(vec![Account::new("333333333333", "data-lake")]),
        ]);

        let report = reconciler
            .run(&path, &mut pager, ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(report.failed_pages, 1);
        assert_eq!(report.added, vec!["payments", "data-lake"]);
    }

    #[tokio::test]
    async fn test_prefix_policy() {
        let mut config = AwsConfigFile::default();
        let policy = AccountPolicy::new(
            vec!["tripadvisor-".into(), "trip-".into(), "core-".into()],
            vec!["trip-".into(), "tripadvisor-".into()],
        );
        let reconciler = Reconciler::new(policy, defaults());
        let mut pager = FakePager::new(vec![Some(vec![
            Account::new("111111111111", "trip-payments"),
            Account::new("222222222222", "tripadvisor-search"),
            Account::new("333333333333", "core-network"),
            Account::new("444444444444", "sandbox-alice"),
        ])]);

        let report = reconciler.merge_accounts(&mut config, &mut pager).await;

        assert_eq!(report.added, vec!["payments", "search", "core-network"]);
        assert_eq!(report.skipped, 1);
        assert!(!config.has_section("profile sandbox-alice"));
    }

    #[test]
    fn test_default_policy_is_verbatim() {
        let policy = AccountPolicy::default();
        let account = Account::new("111111111111", "trip-payments");

        assert!(policy.includes(&account));
        assert_eq!(policy.profile_name(&account), "trip-payments");
    }

    #[tokio::test]
    async fn test_conflicting_names_keep_last_account() {
        let mut config = AwsConfigFile::default();
        let policy = AccountPolicy::new(Vec::new(), vec!["trip-".into()]);
        let reconciler = Reconciler::new(policy, defaults());
        let mut pager = FakePager::new(vec![Some(vec![
            Account::new("111111111111", "trip-payments"),
            Account::new("222222222222", "payments"),
        ])]);

        let report = reconciler.merge_accounts(&mut config, &mut pager).await;

        assert_eq!(report.skipped, 0);
        assert_eq!(report.added, vec!["payments"]);
        assert_eq!(report.refreshed, 1);
        assert_eq!(
            config.get("profile payments", ACCOUNT_ID_KEY),
            Some("222222222222")
        );
        assert_eq!(config.sections().count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_not_touched() {
        let body = "[default]\nregion = us-east-1\nthis line is garbage\n";
        let (_dir, path) = write_config(body);
        let reconciler = Reconciler::new(AccountPolicy::default(), defaults());

        let result = reconciler
            .run(&path, &mut FakePager::new(remote_accounts()), ReconcileOptions::default())
            .await;

        assert!(matches!(result, Err(Error::ConfigFileCorrupt { line: 3, .. })));
        assert_eq!(fs::read_to_string(&path).unwrap(), body);
        assert!(!staged_path(&path).exists());
    }

    #[test]
    fn test_failed_rename_keeps_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let path = dir.path().join("config");
        fs::create_dir_all(path.join("occupied")).unwrap();
        let mut config = AwsConfigFile::default();
        config.add_section("profile x").set("region", "us-east-1");

        let err = commit(&config, &path, false).unwrap_err();

        assert!(matches!(err, Error::PersistFailure { .. }));
        assert_eq!(
            fs::read_to_string(staged_path(&path)).unwrap(),
            "[profile x]\nregion = us-east-1\n"
        );
    }

    #[test]
    fn test_commit_creates_missing_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".aws").join("config");
        let mut config = AwsConfigFile::default();
        config.add_section("profile x").set("region", "us-east-1");

        commit(&config, &path, false).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[profile x]\nregion = us-east-1\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_commit_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, path) = write_config("[default]\nregion = us-east-1\n");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).unwrap();
        let config = AwsConfigFile::load(&path).unwrap();

        commit(&config, &path, false).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_staged_path() {
        assert_eq!(
            staged_path(Path::new("/home/u/.aws/config")),
            PathBuf::from("/home/u/.aws/config.new")
        );
    }
}
