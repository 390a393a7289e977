// Working directory to AWS profile resolution.
//
// A repository is expected to be named after the AWS account it deploys to. The
// profile of that name must exist in the AWS config file, and its `sso_account_id`
// must equal the `account_id` declared in the repository's `terragrunt.hcl`, so a
// misnamed repository can never silently run against another account.
use crate::aws_config::{profile_section, AwsConfigFile};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

pub const ACCOUNT_ID_KEY: &str = "sso_account_id";
const REPO_MARKER: &str = ".git";
const DECLARATION_FILE: &str = "terragrunt.hcl";
const DECLARATION_KEY: &str = "account_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `AWS_PROFILE` was already set; carries its value untouched
    Overridden(String),
    /// Profile derived from the repository and validated
    Resolved(String),
}

impl Resolution {
    pub fn profile(&self) -> &str {
        match self {
            Resolution::Overridden(profile) | Resolution::Resolved(profile) => profile,
        }
    }
}

pub struct ProfileResolver {
    config_file: PathBuf,
    repo_profiles: BTreeMap<String, String>,
}

impl ProfileResolver {
    pub fn new(config_file: PathBuf, repo_profiles: BTreeMap<String, String>) -> Self {
        Self {
            config_file,
            repo_profiles,
        }
    }

    pub fn resolve(&self, override_profile: Option<String>, cwd: &Path) -> Result<Resolution> {
        if let Some(profile) = override_profile {
            tracing::info!(
                "AWS_PROFILE is already set to {} (potentially by direnv?), skipping setup",
                profile
            );
            return Ok(Resolution::Overridden(profile));
        }

        let repo_root = find_repo_root(cwd)?;
        let repo_name = repo_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let profile = profile_for_repo(&repo_name, &self.repo_profiles);
        tracing::debug!(
            "Repository {} maps to profile {}",
            repo_root.display(),
            profile
        );

        let account_id = validate_profile(&profile, &repo_root, &self.config_file)?;
        tracing::info!("Using profile {} ({})", profile, account_id);

        Ok(Resolution::Resolved(profile))
    }
}

/// Nearest ancestor of `start` (inclusive) containing a `.git` entry
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    find_repo_root_below(start, None)
}

/// Like [`find_repo_root`], but never looks above `ceiling`
fn find_repo_root_below(start: &Path, ceiling: Option<&Path>) -> Result<PathBuf> {
    start
        .ancestors()
        .take_while(|dir| ceiling.map_or(true, |top| dir.starts_with(top)))
        .find(|dir| dir.join(REPO_MARKER).exists())
        .map(Path::to_path_buf)
        .ok_or_else(|| Error::NotInRepository(start.to_path_buf()))
}

/// Profile name for a repository; names missing from `table` pass through
pub fn profile_for_repo(repo: &str, table: &BTreeMap<String, String>) -> String {
    table
        .get(repo)
        .cloned()
        .unwrap_or_else(|| repo.to_string())
}

/// Check `profile` against the config file and the repository declaration.
/// Returns the account id on success.
pub fn validate_profile(profile: &str, repo_root: &Path, config_file: &Path) -> Result<String> {
    let config = AwsConfigFile::load(config_file)?;
    let section = config
        .section(&profile_section(profile))
        .ok_or_else(|| Error::ProfileNotFound(profile.to_string()))?;
    let account_id = section
        .get(ACCOUNT_ID_KEY)
        .ok_or_else(|| Error::ParseError {
            profile: profile.to_string(),
            key: ACCOUNT_ID_KEY.to_string(),
        })?
        .to_string();

    let declaration = repo_root.join(DECLARATION_FILE);
    let declared = declared_account_id(&declaration)?;
    if declared.as_deref() != Some(account_id.as_str()) {
        return Err(Error::AccountMismatch {
            profile_account: account_id,
            declared,
            file: declaration,
        });
    }

    Ok(account_id)
}

/// First `account_id = "..."` line of a terragrunt file.
///
/// Lines are split on whitespace; lines with fewer than three fields are ignored.
pub fn declared_account_id(path: &Path) -> Result<Option<String>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let root = path.parent().unwrap_or(path).to_path_buf();
            return Err(Error::DeclarationNotFound(root));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    for line in BufReader::new(file).lines() {
        let line = line?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 || fields[0] != DECLARATION_KEY {
            continue;
        }
        let value = fields[2].trim_matches('"');
        return Ok((!value.is_empty()).then(|| value.to_string()));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const CONFIG: &str = "\
[default]
region = us-east-1

[profile foo]
sso_account_id=123456789012
sso_role_name=AdministratorAccess

[profile no-id]
region = us-east-1

[profile commerce-prd]
sso_account_id = 210987654321
";

    struct Fixture {
        dir: TempDir,
        config_file: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let config_file = dir.path().join("aws-config");
            fs::write(&config_file, CONFIG).unwrap();
            Self { dir, config_file }
        }

        /// Create `<tmp>/<name>` as a repository with the given terragrunt.hcl
        fn repo(&self, name: &str, terragrunt: Option<&str>) -> PathBuf {
            let root = self.dir.path().join(name);
            fs::create_dir_all(root.join(".git")).unwrap();
            if let Some(body) = terragrunt {
                fs::write(root.join("terragrunt.hcl"), body).unwrap();
            }
            root
        }

        fn resolver(&self) -> ProfileResolver {
            let table = [("commerce-prod".to_string(), "commerce-prd".to_string())]
                .into_iter()
                .collect();
            ProfileResolver::new(self.config_file.clone(), table)
        }
    }

    fn terragrunt(account_id: &str) -> String {
        format!(
            "include {{\n  path = find_in_parent_folders()\n}}\n\nlocals {{}}\naccount_id = \"{}\"\n",
            account_id
        )
    }

    #[test]
    fn test_profile_for_repo_mapping() {
        let table: BTreeMap<String, String> = [
            ("commerce-prod", "commerce-prd"),
            ("mlplat-prd", "mlplatprd"),
            ("tripadvisor-hotels-ai", "hotels-ai"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        for (repo, profile) in &table {
            assert_eq!(&profile_for_repo(repo, &table), profile);
        }
        assert_eq!(profile_for_repo("payments", &table), "payments");
        // exact, case-sensitive match only
        assert_eq!(profile_for_repo("Commerce-Prod", &table), "Commerce-Prod");
    }

    #[test]
    fn test_resolves_matching_profile() {
        let fx = Fixture::new();
        let root = fx.repo("foo", Some(&terragrunt("123456789012")));
        let nested = root.join("modules").join("vpc");
        fs::create_dir_all(&nested).unwrap();

        let resolution = fx.resolver().resolve(None, &nested).unwrap();

        assert_eq!(resolution, Resolution::Resolved("foo".to_string()));
        assert_eq!(resolution.profile(), "foo");
    }

    #[test]
    fn test_mapped_repository_name() {
        let fx = Fixture::new();
        let root = fx.repo("commerce-prod", Some(&terragrunt("210987654321")));

        let resolution = fx.resolver().resolve(None, &root).unwrap();

        assert_eq!(resolution, Resolution::Resolved("commerce-prd".to_string()));
    }

    #[test]
    fn test_account_mismatch() {
        let fx = Fixture::new();
        let root = fx.repo("foo", Some(&terragrunt("999999999999")));

        match fx.resolver().resolve(None, &root) {
            Err(Error::AccountMismatch {
                profile_account,
                declared,
                ..
            }) => {
                assert_eq!(profile_account, "123456789012");
                assert_eq!(declared.as_deref(), Some("999999999999"));
            }
            other => panic!("expected AccountMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_declaration_is_mismatch() {
        let fx = Fixture::new();
        let root = fx.repo("foo", Some("locals {}\naccount = 1\n"));

        let err = fx.resolver().resolve(None, &root).unwrap_err();

        assert!(matches!(err, Error::AccountMismatch { declared: None, .. }));
    }

    #[test]
    fn test_missing_terragrunt_file() {
        let fx = Fixture::new();
        let root = fx.repo("foo", None);

        let err = fx.resolver().resolve(None, &root).unwrap_err();

        assert!(matches!(err, Error::DeclarationNotFound(p) if p == root));
    }

    #[test]
    fn test_profile_not_found() {
        let fx = Fixture::new();
        let root = fx.repo("unknown", Some(&terragrunt("123456789012")));

        let err = fx.resolver().resolve(None, &root).unwrap_err();

        assert!(matches!(err, Error::ProfileNotFound(p) if p == "unknown"));
    }

    #[test]
    fn test_profile_without_account_id() {
        let fx = Fixture::new();
        let root = fx.repo("no-id", Some(&terragrunt("123456789012")));

        let err = fx.resolver().resolve(None, &root).unwrap_err();

        assert!(matches!(err, Error::ParseError { ref key, .. } if key == "sso_account_id"));
    }

    #[test]
    fn test_override_skips_resolution() {
        let fx = Fixture::new();
        // not even inside a repository
        let resolution = fx
            .resolver()
            .resolve(Some("manual".to_string()), fx.dir.path())
            .unwrap();

        assert_eq!(resolution, Resolution::Overridden("manual".to_string()));
    }

    #[test]
    fn test_not_in_repository() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain").join("src");
        fs::create_dir_all(&plain).unwrap();

        let err = find_repo_root_below(&plain, Some(dir.path())).unwrap_err();

        assert!(matches!(err, Error::NotInRepository(p) if p == plain));
    }

    #[test]
    fn test_repository_at_ceiling_is_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git")).unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_repo_root_below(&nested, Some(dir.path())).unwrap(),
            dir.path()
        );
        // a checkout above the ceiling is not visible
        assert!(find_repo_root_below(&nested, Some(&dir.path().join("a"))).is_err());
    }

    #[test]
    fn test_nearest_repository_wins() {
        let fx = Fixture::new();
        let outer = fx.repo("outer", None);
        let inner = outer.join("vendor").join("foo");
        fs::create_dir_all(inner.join(".git")).unwrap();

        assert_eq!(find_repo_root(&inner.join("src")).unwrap(), inner);
        assert_eq!(find_repo_root(&inner).unwrap(), inner);
        assert_eq!(find_repo_root(&outer.join("vendor")).unwrap(), outer);
    }

    #[test]
    fn test_declaration_scan_skips_short_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terragrunt.hcl");
        fs::write(
            &path,
            "account_id\naccount_id =\n  inputs = {\n  account_id = \"111122223333\"\naccount_id = \"444455556666\"\n",
        )
        .unwrap();

        // indentation is whitespace too, so the nested assignment is the first match
        assert_eq!(
            declared_account_id(&path).unwrap().as_deref(),
            Some("111122223333")
        );
    }

    #[test]
    fn test_declaration_with_empty_value() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terragrunt.hcl");
        fs::write(&path, "account_id = \"\"\n").unwrap();

        assert_eq!(declared_account_id(&path).unwrap(), None);
    }
}
