//! Remembered passwords, held by the client.
//!
//! The server keeps no session state. A password the user typed is encrypted
//! and handed back to the client in a cookie; on later requests it is read
//! back and decrypted. Two cookies are used: `folderPasswords`, a JSON map
//! from opaque folder id to encrypted password, and `sitePassword`, a single
//! encrypted password for private index mode.

use {
    crate::crypto::Cipher,
    driveindex_protocol::{AccessError, OpaqueId, encoding},
    serde::{Deserialize, Serialize},
    std::{collections::BTreeMap, time::Duration},
    tracing::debug,
};

pub const SITE_PASSWORD_COOKIE: &str = "sitePassword";
pub const FOLDER_PASSWORDS_COOKIE: &str = "folderPasswords";
/// Lifetime of both cookies. Remembered passwords have no other expiry.
pub const CREDENTIAL_MAX_AGE: Duration = Duration::from_secs(365 * 24 * 3600);

/// Key-value storage behind the credential cookies.
///
/// The HTTP server implements it over request and response headers; tests use
/// [`MemoryJar`].
pub trait CredentialJar {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: String);
    /// Must not fail if the value is absent.
    fn remove(&mut self, name: &str);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryJar(BTreeMap<String, String>);

impl MemoryJar {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialJar for MemoryJar {
    #[inline]
    fn get(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }

    #[inline]
    fn set(&mut self, name: &str, value: String) {
        self.0.insert(name.to_owned(), value);
    }

    #[inline]
    fn remove(&mut self, name: &str) {
        self.0.remove(name);
    }
}

/// Content of the `folderPasswords` cookie: opaque folder id to encrypted
/// password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderPasswords(BTreeMap<OpaqueId, OpaqueId>);

impl FolderPasswords {
    #[must_use]
    #[inline]
    pub fn get(&self, folder: &OpaqueId) -> Option<&OpaqueId> {
        self.0.get(folder)
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Reads and writes remembered passwords through a [`CredentialJar`].
///
/// Plaintext passwords are encrypted before they reach the jar.
pub struct CredentialStore<'a, J> {
    cipher: &'a Cipher,
    jar: J,
}

impl<'a, J: CredentialJar> CredentialStore<'a, J> {
    #[inline]
    pub fn new(cipher: &'a Cipher, jar: J) -> Self {
        Self { cipher, jar }
    }

    #[inline]
    pub fn jar(&self) -> &J {
        &self.jar
    }

    #[inline]
    pub fn into_jar(self) -> J {
        self.jar
    }

    /// A malformed cookie reads as empty.
    #[must_use]
    #[inline]
    pub fn folder_passwords(&self) -> FolderPasswords {
        let Some(raw) = self.jar.get(FOLDER_PASSWORDS_COOKIE) else {
            return FolderPasswords::default();
        };
        encoding::deserialize(raw.as_bytes()).unwrap_or_else(|err| {
            debug!(error = %err, "ignoring malformed folder password cookie");
            FolderPasswords::default()
        })
    }

    /// Decrypted site password, if one is remembered and readable.
    #[must_use]
    #[inline]
    pub fn site_password(&self) -> Option<String> {
        let raw = self.jar.get(SITE_PASSWORD_COOKIE)?;
        self.cipher
            .decrypt_password(&raw)
            .inspect_err(|err| debug!(error = %err, "ignoring unreadable site password cookie"))
            .ok()
    }

    /// Remembers `plaintext` for `folder`, keeping passwords of other folders.
    ///
    /// Fails with [`AccessError::Decryption`] if `folder` was not issued under
    /// the current key.
    #[inline]
    pub fn set_folder_password(
        &mut self,
        folder: &OpaqueId,
        plaintext: &str,
    ) -> Result<(), AccessError> {
        self.cipher.decrypt_id(folder)?;
        let mut passwords = self.folder_passwords();
        passwords
            .0
            .insert(folder.clone(), self.cipher.encrypt_password(plaintext)?.into());
        let value = encoding::serialize_to_string(&passwords).map_err(anyhow::Error::from)?;
        self.jar.set(FOLDER_PASSWORDS_COOKIE, value);
        debug!(%folder, remembered = passwords.len(), "folder password remembered");
        Ok(())
    }

    #[inline]
    pub fn set_site_password(&mut self, plaintext: &str) -> Result<(), AccessError> {
        let value = self.cipher.encrypt_password(plaintext)?;
        self.jar.set(SITE_PASSWORD_COOKIE, value);
        debug!("site password remembered");
        Ok(())
    }

    #[inline]
    pub fn clear_all(&mut self) {
        self.jar.remove(SITE_PASSWORD_COOKIE);
        self.jar.remove(FOLDER_PASSWORDS_COOKIE);
    }
}
