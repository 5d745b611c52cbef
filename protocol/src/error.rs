use {crate::OpaqueId, thiserror::Error};

/// Failure of a credential-gated request.
///
/// Messages never contain real store identifiers, only path segment names
/// supplied by the client and opaque ids.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Malformed ciphertext, or ciphertext produced under another key.
    /// Reported to clients as "not found".
    #[error("resource not found")]
    Decryption,

    #[error("path segment `{segment}` not found")]
    SegmentNotFound { segment: String },

    /// The segment exists but is not a child of the previous segment.
    #[error("path segment `{segment}` is not a descendant of the root folder")]
    InvalidChain { segment: String },

    #[error("password required for folder {folder}")]
    PasswordRequired { folder: OpaqueId },

    #[error("incorrect password for folder {folder}")]
    PasswordIncorrect { folder: OpaqueId },

    #[error("download token expired")]
    TokenExpired,

    #[error("download token invalid")]
    TokenInvalid,

    #[error("backing store failed: {0}")]
    Store(#[from] anyhow::Error),
}

impl AccessError {
    /// Stable machine-readable name, used in logs and response bodies.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decryption => "not_found",
            Self::SegmentNotFound { .. } => "segment_not_found",
            Self::InvalidChain { .. } => "invalid_chain",
            Self::PasswordRequired { .. } => "password_required",
            Self::PasswordIncorrect { .. } => "password_incorrect",
            Self::TokenExpired => "token_expired",
            Self::TokenInvalid => "token_invalid",
            Self::Store(_) => "store_error",
        }
    }

    /// Whether the client should render a "not found" page.
    #[must_use]
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Decryption | Self::SegmentNotFound { .. } | Self::InvalidChain { .. }
        )
    }
}

#[test]
fn messages_name_segments_only() {
    let err = AccessError::InvalidChain {
        segment: "private".into(),
    };
    assert_eq!(
        err.to_string(),
        "path segment `private` is not a descendant of the root folder"
    );
    assert!(err.is_not_found());
    assert_eq!(AccessError::Decryption.to_string(), "resource not found");
    assert!(!AccessError::TokenExpired.is_not_found());
}
