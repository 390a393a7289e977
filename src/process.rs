// External processes: the diff viewer and the credential wrapper
use crate::env::AWS_PROFILE;
use crate::error::{Error, Result};
use std::path::Path;
use std::process::Command;

const DIFF_PROGRAM: &str = "diff";

/// Print a line diff of two files to stdout.
///
/// Cosmetic only: a missing file or a missing `diff` binary is logged and ignored.
/// Returns whether the diff ran.
pub fn show_diff(original: &Path, updated: &Path) -> bool {
    for file in [original, updated] {
        if !file.exists() {
            tracing::warn!("File {} does not exist, skipping diff", file.display());
            return false;
        }
    }

    // diff exits 1 when the files differ, which is the interesting case
    match Command::new(DIFF_PROGRAM).arg(original).arg(updated).status() {
        Ok(status) => {
            tracing::debug!("{} exited with {}", DIFF_PROGRAM, status);
            true
        }
        Err(e) => {
            tracing::warn!("Could not run {}: {}", DIFF_PROGRAM, e);
            false
        }
    }
}

/// Run `program` with inherited stdio and return its exit code.
///
/// `profile` is exported as `AWS_PROFILE` for the child only; `None` leaves the
/// inherited environment alone.
pub fn run_wrapped(program: &str, args: &[String], profile: Option<&str>) -> Result<i32> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(profile) = profile {
        command.env(AWS_PROFILE, profile);
    }

    tracing::debug!("Running {} {:?}", program, args);
    let status = command.status().map_err(|source| Error::Spawn {
        program: program.to_string(),
        source,
    })?;

    // Killed by a signal: no code to pass through
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_diff_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("config");
        std::fs::write(&present, "[default]\n").unwrap();

        assert!(!show_diff(&present, &dir.path().join("config.new")));
        assert!(!show_diff(&dir.path().join("missing"), &present));
    }

    #[test]
    fn test_run_wrapped_missing_program() {
        let err = run_wrapped("definitely-not-a-real-wrapper-binary", &[], None).unwrap_err();
        assert!(matches!(err, Error::Spawn { ref program, .. } if program == "definitely-not-a-real-wrapper-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_wrapped_passes_exit_code_through() {
        let args = vec!["-c".to_string(), "exit 3".to_string()];
        assert_eq!(run_wrapped("sh", &args, None).unwrap(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_wrapped_exports_profile() {
        let args = vec![
            "-c".to_string(),
            "test \"$AWS_PROFILE\" = team-prd".to_string(),
        ];
        assert_eq!(run_wrapped("sh", &args, Some("team-prd")).unwrap(), 0);
    }
}
