use crate::config::Config;
use crate::env;
use crate::error::Result;
use crate::process;
use crate::profile::{ProfileResolver, Resolution};

/// Resolve the profile, run the wrapper and exit with its status
pub fn execute(config: &Config, args: Vec<String>) -> Result<()> {
    let resolver = ProfileResolver::new(config.aws_config_file()?, config.repo_profiles.clone());
    let cwd = std::env::current_dir()?;

    let profile = match resolver.resolve(env::profile_override(), &cwd)? {
        // already in the environment, the child inherits it
        Resolution::Overridden(_) => None,
        Resolution::Resolved(profile) => Some(profile),
    };

    let code = process::run_wrapped(&config.run.wrapper, &args, profile.as_deref())?;
    std::process::exit(code);
}
