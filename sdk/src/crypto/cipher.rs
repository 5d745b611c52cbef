use {
    aes_siv::{
        Aes256SivAead, KeyInit, Nonce,
        aead::{Aead, Payload},
    },
    anyhow::{Context, Result, anyhow, ensure},
    base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD},
    driveindex_protocol::{AccessError, EncryptionKey, OpaqueId, encoding},
    serde::{Serialize, de::DeserializeOwned},
    tracing::debug,
};

/// What a ciphertext is for. Bound into every ciphertext as associated data,
/// so a value sealed for one purpose never opens as another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Domain {
    Id,
    Token,
    Password,
}

impl Domain {
    fn associated_data(self) -> &'static [u8] {
        match self {
            Self::Id => b"driveindex:id",
            Self::Token => b"driveindex:token",
            Self::Password => b"driveindex:password",
        }
    }
}

pub struct Cipher {
    inner: Aes256SivAead,
}

impl Cipher {
    #[must_use]
    #[inline]
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            inner: Aes256SivAead::new(key.get()),
        }
    }

    fn seal(&self, domain: Domain, value: &str) -> Result<String> {
        let payload = Payload {
            msg: value.as_bytes(),
            aad: domain.associated_data(),
        };
        let ciphertext = self
            .inner
            .encrypt(&Nonce::default(), payload)
            .map_err(|_| anyhow!("encryption failed"))?;
        Ok(BASE64_URL_SAFE_NO_PAD.encode(ciphertext))
    }

    fn open(&self, domain: Domain, value: &str) -> Result<String> {
        let ciphertext = BASE64_URL_SAFE_NO_PAD
            .decode(value)
            .context("ciphertext is not valid base64")?;
        let payload = Payload {
            msg: ciphertext.as_slice(),
            aad: domain.associated_data(),
        };
        let plaintext = self
            .inner
            .decrypt(&Nonce::default(), payload)
            .map_err(|_| anyhow!("decryption failed"))?;
        Ok(String::from_utf8(plaintext)?)
    }

    /// Converts a real store identifier into the opaque form shown to clients.
    #[inline]
    pub fn encrypt_id(&self, real: &str) -> Result<OpaqueId> {
        ensure!(!real.is_empty(), "cannot encrypt an empty identifier");
        self.seal(Domain::Id, real).map(OpaqueId::from)
    }

    /// Recovers the real store identifier behind an opaque id.
    ///
    /// Any failure is reported as [`AccessError::Decryption`], which callers
    /// must treat as "not found".
    #[inline]
    pub fn decrypt_id(&self, opaque: &OpaqueId) -> Result<String, AccessError> {
        match self.open(Domain::Id, opaque.as_str()) {
            Ok(real) if !real.is_empty() => Ok(real),
            Ok(_) => {
                debug!(%opaque, "opaque id decrypts to an empty identifier");
                Err(AccessError::Decryption)
            }
            Err(err) => {
                debug!(%opaque, error = %err, "rejected opaque id");
                Err(AccessError::Decryption)
            }
        }
    }

    /// Encrypts a download token payload.
    #[inline]
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<String> {
        self.seal(Domain::Token, &encoding::serialize_to_string(value)?)
    }

    #[inline]
    pub fn decrypt_json<T: DeserializeOwned>(&self, value: &str) -> Result<T, AccessError> {
        let plaintext = self.open(Domain::Token, value).map_err(|err| {
            debug!(error = %err, "rejected encrypted payload");
            AccessError::Decryption
        })?;
        encoding::deserialize(plaintext.as_bytes()).map_err(|err| {
            debug!(error = %err, "encrypted payload has unexpected shape");
            AccessError::Decryption
        })
    }

    /// Encrypts a password to be remembered by the client or kept in the
    /// config file.
    #[inline]
    pub fn encrypt_password(&self, plaintext: &str) -> Result<String> {
        self.seal(Domain::Password, plaintext)
    }

    #[inline]
    pub fn decrypt_password(&self, value: &str) -> Result<String> {
        self.open(Domain::Password, value)
    }
}
