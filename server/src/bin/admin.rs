use {
    anyhow::Result,
    clap::{Parser, Subcommand, ValueEnum},
    driveindex_protocol::EncryptionKey,
    driveindex_sdk::{crypto::Cipher, token::issue_token},
    driveindex_server::{Config, config::default_config_path},
    std::path::PathBuf,
};

#[derive(Debug, Parser)]
pub struct Cli {
    /// Defaults to `driveindex.json5` in the system config directory.
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Print a new random encryption key.
    GenerateKey,
    /// Print the encrypted form of a config value.
    Encrypt { kind: ValueKind, value: String },
    /// Print a download token.
    IssueToken {
        /// Defaults to the configured token lifetime.
        #[clap(long)]
        hours: Option<u32>,
    },
}

/// Config values stored encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ValueKind {
    /// `encrypted_root_id`
    RootId,
    /// `encrypted_site_password`
    SitePassword,
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => default_config_path()?,
    };
    Config::parse(path)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::GenerateKey => {
            let key = EncryptionKey::generate()?;
            println!("{}", key.display_unmasked());
        }
        Command::Encrypt { kind, value } => {
            let config = load_config(cli.config)?;
            let cipher = Cipher::new(&config.encryption_key);
            let encrypted = match kind {
                ValueKind::RootId => cipher.encrypt_id(&value)?.to_string(),
                ValueKind::SitePassword => cipher.encrypt_password(&value)?,
            };
            println!("{encrypted}");
        }
        Command::IssueToken { hours } => {
            let config = load_config(cli.config)?;
            let cipher = Cipher::new(&config.encryption_key);
            let hours = hours.unwrap_or(config.token_duration_hours);
            println!("{}", issue_token(&cipher, hours)?);
        }
    }
    Ok(())
}
