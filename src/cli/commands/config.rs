use crate::cli::ConfigCommand;
use crate::config::{Config, ConfigKey};
use crate::error::Result;
use std::path::Path;

pub fn execute(command: ConfigCommand, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => Config::default_file_path()?,
    };

    match command {
        ConfigCommand::Init => {
            Config::create_sample(&path)?;
            println!("✓ Sample config written to {}", path.display());
            println!("  Set your SSO start URL with:");
            println!("    aws-sso-config config set sso.start_url https://my-org.awsapps.com/start");
        }
        ConfigCommand::Path => show_path(&path, explicit),
        ConfigCommand::List => {
            let config = Config::load(explicit)?;
            for key in ConfigKey::ALL {
                println!("{:<20} = {:<40} # {}", key, config.get(key), key.description());
            }
        }
        ConfigCommand::Get { key } => {
            let key: ConfigKey = key.parse()?;
            println!("{}", Config::load(explicit)?.get(key));
        }
        ConfigCommand::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            let mut config = stored(&path)?;
            config.set(key, &value);
            config.save(&path)?;
            println!("✓ {} = {}", key, value);
        }
        ConfigCommand::Unset { key } => {
            let key: ConfigKey = key.parse()?;
            let mut config = stored(&path)?;
            config.unset(key);
            config.save(&path)?;
            println!("✓ {} reset to '{}'", key, config.get(key));
        }
    }

    Ok(())
}

/// File contents without environment overrides, so `set` never persists them
fn stored(path: &Path) -> Result<Config> {
    if path.exists() {
        Config::load_file(path)
    } else {
        Ok(Config::default())
    }
}

fn show_path(path: &Path, explicit: Option<&Path>) {
    println!("Config file path: {}", path.display());

    if !path.exists() {
        println!("Status: File does not exist");
        println!("\nTo create a sample config file, run:");
        println!("  aws-sso-config config init");
        return;
    }

    println!("Status: File exists");
    match Config::load(explicit) {
        Ok(config) => {
            println!("Valid: Yes");
            match config.start_url() {
                Ok(start_url) => {
                    println!("Complete: Yes");
                    println!("\nSSO Configuration:");
                    println!("  Start URL: {}", start_url);
                    println!("  Region: {}", config.sso.region);
                }
                Err(_) => println!("Complete: No (missing sso.start_url)"),
            }
        }
        Err(e) => {
            println!("Valid: No");
            println!("Error: {}", e);
        }
    }
}
