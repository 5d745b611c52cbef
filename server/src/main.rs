use {
    anyhow::Result,
    clap::Parser,
    driveindex_server::{Config, config::default_config_path},
    std::path::PathBuf,
    tracing::info,
    tracing_subscriber::{EnvFilter, prelude::*},
};

#[derive(Debug, Parser)]
#[clap(about = "Serves a Drive folder tree behind opaque ids and folder passwords")]
pub struct Cli {
    /// Defaults to `driveindex.json5` in the system config directory.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = match cli.config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let config = Config::parse(&config_path)?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    info!(config = %config_path.display(), "starting");
    driveindex_server::run(config).await
}
