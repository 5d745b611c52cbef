use {
    aes_siv::{Aes256SivAead, Key, aead::{Generate, array::Array}},
    anyhow::{Error, format_err},
    base64::{Engine, display::Base64Display, prelude::BASE64_URL_SAFE_NO_PAD},
    generic_array::typenum::U64,
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        borrow::Cow,
        fmt::{self, Debug, Display},
        str::FromStr,
    },
};

/// Server-held secret behind every opaque identifier, remembered password
/// and download token.
///
/// Rotating the key invalidates all opaque ids already handed out to clients,
/// including the ones stored in their cookies.
#[derive(Clone)]
pub struct EncryptionKey(Array<u8, U64>);

const KEY_LENGTH: usize = 64;

impl EncryptionKey {
    #[inline]
    pub fn generate() -> anyhow::Result<Self> {
        Ok(Self(Key::<Aes256SivAead>::try_generate()?))
    }

    #[must_use]
    #[inline]
    pub fn get(&self) -> &Array<u8, U64> {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn display_unmasked(&self) -> impl Display + '_ {
        Base64Display::new(self.0.as_ref(), &BASE64_URL_SAFE_NO_PAD)
    }
}

impl<'de> Deserialize<'de> for EncryptionKey {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cow::<'_, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Serialize for EncryptionKey {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BASE64_URL_SAFE_NO_PAD.encode(self.0).serialize(serializer)
    }
}

impl FromStr for EncryptionKey {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = BASE64_URL_SAFE_NO_PAD.decode(s.trim())?;
        let array = <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|bytes| {
            format_err!("invalid key length; got {}, expected {KEY_LENGTH}", bytes.len())
        })?;
        Ok(Self(array.into()))
    }
}

impl Debug for EncryptionKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static KEY: &str = "qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqg";

    #[test]
    fn parse_and_display() {
        let key = EncryptionKey::from_str(KEY).unwrap();
        assert_eq!(key.display_unmasked().to_string(), KEY);
        EncryptionKey::from_str("").unwrap_err();
        EncryptionKey::from_str("qqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqqo").unwrap_err();
        EncryptionKey::from_str(&format!("{KEY}:")).unwrap_err();
    }

    #[test]
    fn debug_is_masked() {
        let key = EncryptionKey::from_str(KEY).unwrap();
        assert!(!format!("{key:?}").contains(KEY));
    }

    #[test]
    fn serde_as_string() {
        let key: EncryptionKey = serde_json::from_str(&format!("\"{KEY}\"")).unwrap();
        assert_eq!(
            serde_json::to_string(&key).unwrap(),
            format!("\"{KEY}\"")
        );
    }
}
