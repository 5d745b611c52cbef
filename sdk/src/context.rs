use {
    crate::crypto::Cipher,
    derivative::Derivative,
    driveindex_protocol::{AccessError, EncryptionKey, OpaqueId},
};

pub const DEFAULT_PASSWORD_FILE_NAME: &str = ".password";
pub const DEFAULT_TOKEN_DURATION_HOURS: u32 = 6;

/// Read-only configuration of the access layer, passed into every gate call.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct AccessContext {
    #[derivative(Debug = "ignore")]
    cipher: Cipher,
    #[derivative(Debug = "ignore")]
    root_id: String,
    password_file_name: String,
    token_duration_hours: u32,
    #[derivative(Debug = "ignore")]
    site_password: Option<String>,
}

impl AccessContext {
    #[must_use]
    #[inline]
    pub fn new(cipher: Cipher, root_id: impl Into<String>) -> Self {
        Self {
            cipher,
            root_id: root_id.into(),
            password_file_name: DEFAULT_PASSWORD_FILE_NAME.into(),
            token_duration_hours: DEFAULT_TOKEN_DURATION_HOURS,
            site_password: None,
        }
    }

    /// Builds a context from a key and the root folder id in opaque form,
    /// as it is kept in configuration files.
    #[inline]
    pub fn from_encrypted_root(
        key: &EncryptionKey,
        encrypted_root_id: &OpaqueId,
    ) -> Result<Self, AccessError> {
        let cipher = Cipher::new(key);
        let root_id = cipher.decrypt_id(encrypted_root_id)?;
        Ok(Self::new(cipher, root_id))
    }

    #[must_use]
    #[inline]
    pub fn with_password_file_name(mut self, name: impl Into<String>) -> Self {
        self.password_file_name = name.into();
        self
    }

    #[must_use]
    #[inline]
    pub fn with_token_duration_hours(mut self, hours: u32) -> Self {
        self.token_duration_hours = hours;
        self
    }

    /// Enables private index mode: every request must carry this password.
    #[must_use]
    #[inline]
    pub fn with_site_password(mut self, password: impl Into<String>) -> Self {
        self.site_password = Some(password.into());
        self
    }

    #[must_use]
    #[inline]
    pub fn cipher(&self) -> &Cipher {
        &self.cipher
    }

    #[must_use]
    #[inline]
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    #[must_use]
    #[inline]
    pub fn password_file_name(&self) -> &str {
        &self.password_file_name
    }

    #[must_use]
    #[inline]
    pub fn token_duration_hours(&self) -> u32 {
        self.token_duration_hours
    }

    #[must_use]
    #[inline]
    pub fn site_password(&self) -> Option<&str> {
        self.site_password.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_from_configuration() {
        let key = EncryptionKey::generate().unwrap();
        let encrypted = Cipher::new(&key).encrypt_id("0AbCroot").unwrap();
        let ctx = AccessContext::from_encrypted_root(&key, &encrypted).unwrap();
        assert_eq!(ctx.root_id(), "0AbCroot");
        assert_eq!(ctx.password_file_name(), ".password");
        assert_eq!(ctx.token_duration_hours(), 6);
        assert!(!format!("{ctx:?}").contains("0AbCroot"));

        let other = EncryptionKey::generate().unwrap();
        assert!(matches!(
            AccessContext::from_encrypted_root(&other, &encrypted),
            Err(AccessError::Decryption)
        ));
    }
}
