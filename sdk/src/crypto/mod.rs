//! All identifiers exposed to clients are encrypted with AES-SIV.
//!
//! A zero nonce is used, so the result is deterministic: the same real store
//! identifier always maps to the same opaque id. This is what allows a client
//! to remember a password under the opaque id of a folder and have it found
//! again on the next request.
//!
//! SIV is an authenticated mode. Ciphertext produced under a different key,
//! truncated, or altered in a single bit fails to decrypt instead of yielding
//! a plaintext that could collide with a real identifier.
//!
//! Ciphertext is encoded in URL-safe base64 without padding, so opaque ids
//! can be placed in paths, query strings and cookie values as is.
//!
//! Download tokens and remembered passwords go through the same key; the
//! former encrypt a small JSON payload, the latter the plaintext password.
//! Each kind of value is sealed with its own associated data, so a client
//! that gets a password of its choosing encrypted cannot pass the result off
//! as an opaque id or a download token.

mod cipher;

pub use cipher::Cipher;

/// Compares a remembered password with the secret stored in a marker file.
///
/// Plain equality: no normalization, no trimming.
#[must_use]
#[inline]
pub fn password_matches(remembered: &str, secret: &str) -> bool {
    remembered == secret
}

/// Checks one link of a path chain: `parent` must be exactly `expected`.
#[must_use]
#[inline]
pub fn is_parent_link(parent: Option<&str>, expected: &str) -> bool {
    parent == Some(expected)
}
