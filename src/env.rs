// Environment detection utilities

/// Profile override honoured by every AWS tool; when set we never resolve our own
pub const AWS_PROFILE: &str = "AWS_PROFILE";

/// Current `AWS_PROFILE`, if the user (or direnv) set one
pub fn profile_override() -> Option<String> {
    std::env::var(AWS_PROFILE).ok()
}

/// Check if we're running in a headless environment
///
/// Headless mode is detected when:
/// - `force` is set (the --headless CLI flag)
/// - SSH_TTY or SSH_CONNECTION environment variables are set (SSH session)
/// - TERM is set to "dumb" or is empty
/// - On Linux: DISPLAY environment variable is not set (no X11)
/// - CI environment is detected
///
/// Note: macOS doesn't use DISPLAY, so we don't check it on Darwin
pub fn is_headless_environment(force: bool) -> bool {
    if force {
        tracing::debug!("Headless mode: forced by --headless flag");
        return true;
    }

    if std::env::var("SSH_TTY").is_ok() {
        tracing::debug!("Headless detected: SSH_TTY set");
        return true;
    }

    if std::env::var("SSH_CONNECTION").is_ok() {
        tracing::debug!("Headless detected: SSH_CONNECTION set");
        return true;
    }

    if std::env::var("CI").is_ok() {
        tracing::debug!("Headless detected: CI environment");
        return true;
    }

    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" || term.is_empty() {
            tracing::debug!("Headless detected: TERM is '{}'", term);
            return true;
        }
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if std::env::var("DISPLAY").is_err() && std::env::var("WAYLAND_DISPLAY").is_err() {
            tracing::debug!("Headless detected: no DISPLAY or WAYLAND_DISPLAY");
            return true;
        }
    }

    tracing::debug!("Not headless: detected graphical environment");
    false
}
