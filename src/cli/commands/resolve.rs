use crate::config::Config;
use crate::env;
use crate::error::Result;
use crate::profile::ProfileResolver;

pub fn execute(config: &Config) -> Result<()> {
    let resolver = ProfileResolver::new(config.aws_config_file()?, config.repo_profiles.clone());
    let cwd = std::env::current_dir()?;

    let resolution = resolver.resolve(env::profile_override(), &cwd)?;
    println!("{}", resolution.profile());

    Ok(())
}
