use {
    anyhow::{Context as _, Result},
    derivative::Derivative,
    driveindex_protocol::{EncryptionKey, OpaqueId},
    driveindex_sdk::{
        context::{AccessContext, DEFAULT_PASSWORD_FILE_NAME, DEFAULT_TOKEN_DURATION_HOURS},
        store::DriveConfig,
    },
    serde::{Deserialize, Serialize},
    std::{
        net::SocketAddr,
        path::{Path, PathBuf},
    },
    url::Url,
};

pub const CONFIG_FILE_NAME: &str = "driveindex.json5";

#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// Base of the download links handed out in listings.
    pub public_url: Url,
    #[derivative(Debug = "ignore")]
    pub encryption_key: EncryptionKey,
    /// Root folder id, encrypted with `encryption_key`.
    pub encrypted_root_id: OpaqueId,
    #[serde(default = "default_password_file_name")]
    pub password_file_name: String,
    #[serde(default = "default_token_duration_hours")]
    pub token_duration_hours: u32,
    /// Enables private index mode. Encrypted with `encryption_key`.
    #[serde(default)]
    pub encrypted_site_password: Option<OpaqueId>,
    pub drive: DriveConfig,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_password_file_name() -> String {
    DEFAULT_PASSWORD_FILE_NAME.into()
}

fn default_token_duration_hours() -> u32 {
    DEFAULT_TOKEN_DURATION_HOURS
}

fn default_log_filter() -> String {
    "info".into()
}

impl Config {
    #[inline]
    pub fn parse(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs_err::read_to_string(path)?;
        json5::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Decrypts the root folder id and site password.
    #[inline]
    pub fn access_context(&self) -> Result<AccessContext> {
        let mut ctx = AccessContext::from_encrypted_root(&self.encryption_key, &self.encrypted_root_id)
            .context("failed to decrypt `encrypted_root_id`; was it encrypted with this key?")?
            .with_password_file_name(&self.password_file_name)
            .with_token_duration_hours(self.token_duration_hours);
        if let Some(site_password) = &self.encrypted_site_password {
            let password = ctx
                .cipher()
                .decrypt_password(site_password.as_str())
                .context("failed to decrypt `encrypted_site_password`")?;
            ctx = ctx.with_site_password(password);
        }
        Ok(ctx)
    }
}

#[cfg(target_os = "linux")]
#[inline]
pub fn default_config_dir() -> Result<PathBuf> {
    Ok("/etc".into())
}

// Windows: %APPDATA% (%USERPROFILE%\AppData\Roaming);
// macOS: $HOME/Library/Application Support
#[cfg(not(target_os = "linux"))]
#[inline]
pub fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir().ok_or_else(|| anyhow::anyhow!("failed to get config dir"))
}

#[inline]
pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join(CONFIG_FILE_NAME))
}
