pub mod credentials;
pub mod encoding;
pub mod endpoints;
mod error;
mod path;

pub use crate::{
    credentials::EncryptionKey,
    error::AccessError,
    path::{PathSegment, RequestPath},
};

use {
    chrono::Utc,
    derive_more::{Display, From, Into},
    serde::{Deserialize, Serialize},
};

pub type DateTimeUtc = chrono::DateTime<Utc>;

/// Mime type the store uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Ciphertext exposed to clients in place of a real store identifier.
///
/// The value is URL-safe base64 and can be embedded in paths, query strings
/// and cookie values without further escaping.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
)]
#[serde(transparent)]
pub struct OpaqueId(String);

impl OpaqueId {
    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OpaqueId {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OpaqueId {
    #[inline]
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// A file or folder record as returned by the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

impl Entry {
    #[must_use]
    #[inline]
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME_TYPE
    }

    /// Parent used for chain validation. Only the first parent counts.
    #[must_use]
    #[inline]
    pub fn parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }
}

/// Decrypted content of a download token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTokenPayload {
    /// Expiry instant in milliseconds since the Unix epoch.
    #[serde(rename = "expiredAt")]
    pub expired_at: i64,
}
