//! Short-lived download tokens.
//!
//! A token is the encrypted JSON `{"expiredAt": <ms since epoch>}`. Nothing is
//! stored server-side: a token stays valid for any number of downloads until
//! it expires.

use {
    crate::crypto::Cipher,
    anyhow::{Context as _, Result},
    chrono::Utc,
    driveindex_protocol::{AccessError, DateTimeUtc, DownloadTokenPayload, OpaqueId},
    tracing::debug,
};

const MILLIS_PER_HOUR: i64 = 3_600_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    Expired,
    Invalid,
}

impl TokenStatus {
    #[inline]
    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            Self::Valid => Ok(()),
            Self::Expired => Err(AccessError::TokenExpired),
            Self::Invalid => Err(AccessError::TokenInvalid),
        }
    }
}

#[inline]
pub fn issue_token(cipher: &Cipher, duration_hours: u32) -> Result<OpaqueId> {
    issue_token_at(cipher, Utc::now(), duration_hours)
}

#[inline]
pub fn issue_token_at(cipher: &Cipher, now: DateTimeUtc, duration_hours: u32) -> Result<OpaqueId> {
    let expired_at = i64::from(duration_hours)
        .checked_mul(MILLIS_PER_HOUR)
        .and_then(|duration| now.timestamp_millis().checked_add(duration))
        .context("token expiry is out of range")?;
    cipher
        .encrypt_json(&DownloadTokenPayload { expired_at })
        .map(OpaqueId::from)
}

#[must_use]
#[inline]
pub fn verify_token(cipher: &Cipher, token: &str) -> TokenStatus {
    verify_token_at(cipher, Utc::now(), token)
}

/// A token is still valid at the exact millisecond of its expiry.
#[must_use]
#[inline]
pub fn verify_token_at(cipher: &Cipher, now: DateTimeUtc, token: &str) -> TokenStatus {
    match cipher.decrypt_json::<DownloadTokenPayload>(token) {
        Err(_) => TokenStatus::Invalid,
        Ok(payload) if now.timestamp_millis() > payload.expired_at => {
            debug!(expired_at = payload.expired_at, "download token expired");
            TokenStatus::Expired
        }
        Ok(_) => TokenStatus::Valid,
    }
}
