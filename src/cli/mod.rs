// CLI interface
pub mod commands;

use crate::config::Config;
use crate::error::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "aws-sso-config")]
#[command(about = "Keep ~/.aws/config in sync with AWS SSO and pick the right profile per repository", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the aws-sso-config configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Never try to open a browser during login
    #[arg(long, global = true)]
    pub headless: bool,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add or refresh a profile for every SSO account in the AWS config file
    Generate {
        /// Show a diff of the changes before replacing the file
        #[arg(long)]
        diff: bool,

        /// Remove profiles of retired accounts
        #[arg(long)]
        cleanup: bool,
    },

    /// Run the credential wrapper with the profile of the current repository
    Run {
        /// Arguments passed to the wrapper
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the profile for the current repository
    Resolve,

    /// Interactive login to AWS SSO
    Login {
        /// Force re-authentication
        #[arg(short, long)]
        force: bool,
    },

    /// List SSO accounts and the profile generated for each
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = ListFormat::Text)]
        format: ListFormat,
    },

    /// Manage the aws-sso-config configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(aws-sso-config completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(aws-sso-config completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   aws-sso-config completions fish > ~/.config/fish/completions/aws-sso-config.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a commented sample configuration file
    Init,
    /// Show where the configuration file lives and whether it is usable
    Path,
    /// Show every key with its current value
    List,
    /// Print one value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
    /// Reset a value to its default
    Unset { key: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

pub async fn execute(args: Cli) -> Result<()> {
    let config_path = args.config.as_deref();

    match args.command {
        Commands::Config { command } => commands::config::execute(command, config_path),
        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            Ok(())
        }
        command => {
            let config = Config::load(config_path)?;
            match command {
                Commands::Generate { diff, cleanup } => {
                    commands::generate::execute(&config, args.headless, diff, cleanup).await
                }
                Commands::Run { args: wrapped } => commands::run::execute(&config, wrapped),
                Commands::Resolve => commands::resolve::execute(&config),
                Commands::Login { force } => {
                    commands::login::execute(&config, args.headless, force).await
                }
                Commands::List { format } => {
                    commands::list::execute(&config, args.headless, format).await
                }
                Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_flags() {
        let cli = Cli::parse_from(["aws-sso-config", "generate", "--diff", "--cleanup"]);
        assert!(matches!(
            cli.command,
            Commands::Generate {
                diff: true,
                cleanup: true
            }
        ));
    }

    #[test]
    fn test_run_passes_wrapper_arguments_through() {
        let cli = Cli::parse_from([
            "aws-sso-config",
            "--verbose",
            "run",
            "terragrunt",
            "plan",
            "--terragrunt-non-interactive",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Commands::Run { args } => {
                assert_eq!(args, vec!["terragrunt", "plan", "--terragrunt-non-interactive"])
            }
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "aws-sso-config",
            "list",
            "--format",
            "json",
            "--config",
            "/tmp/c.toml",
            "--headless",
        ]);

        assert!(cli.headless);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
        assert!(matches!(
            cli.command,
            Commands::List {
                format: ListFormat::Json
            }
        ));
    }

    #[test]
    fn test_config_set() {
        let cli = Cli::parse_from(["aws-sso-config", "config", "set", "sso.role", "ReadOnly"]);
        match cli.command {
            Commands::Config {
                command: ConfigCommand::Set { key, value },
            } => {
                assert_eq!(key, "sso.role");
                assert_eq!(value, "ReadOnly");
            }
            other => panic!("expected config set, got {:?}", other),
        }
    }
}
