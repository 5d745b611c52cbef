use {
    crate::handler::{ResponseBody, json_response},
    driveindex_protocol::{
        AccessError,
        endpoints::{ErrorBody, Prompt, PromptReason, PromptTarget},
    },
    hyper::{Response, StatusCode},
    std::fmt::Display,
    thiserror::Error,
    tracing::warn,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("no such endpoint")]
    UnknownEndpoint,
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    #[inline]
    pub fn bad_request(err: impl Display) -> Self {
        Self::BadRequest(err.to_string())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Access(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            Self::Access(
                AccessError::PasswordRequired { .. }
                | AccessError::PasswordIncorrect { .. }
                | AccessError::TokenExpired
                | AccessError::TokenInvalid,
            ) => StatusCode::UNAUTHORIZED,
            Self::Access(AccessError::Store(_)) => StatusCode::BAD_GATEWAY,
            Self::Access(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::UnknownEndpoint => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Access(err) => err.kind(),
            Self::BadRequest(_) => "bad_request",
            Self::UnknownEndpoint => "unknown_endpoint",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Internal(_) => "internal",
        }
    }

    fn prompt(&self) -> Option<Prompt> {
        match self {
            Self::Access(AccessError::PasswordRequired { folder }) => {
                Some(Prompt::folder(folder.clone(), PromptReason::Required))
            }
            Self::Access(AccessError::PasswordIncorrect { folder }) => {
                Some(Prompt::folder(folder.clone(), PromptReason::Incorrect))
            }
            _ => None,
        }
    }

    /// Client-facing message. Store failures are reported without details.
    fn message(&self) -> String {
        match self {
            Self::Access(AccessError::Store(_)) => "backing store failed".into(),
            _ => self.to_string(),
        }
    }

    pub fn into_response(self) -> Response<ResponseBody> {
        if let Self::Access(AccessError::Store(err)) | Self::Internal(err) = &self {
            warn!(kind = self.kind(), error = %err, "request failed");
        }
        let body = ErrorBody {
            error: self.kind().into(),
            message: self.message(),
            prompt: self.prompt(),
        };
        json_response(self.status(), &body)
    }
}

/// 401 response asking the client for a password.
pub fn prompt_response(prompt: Prompt) -> Response<ResponseBody> {
    let (error, message) = match (&prompt.target, prompt.reason) {
        (PromptTarget::Site, PromptReason::Required) => {
            ("site_password_required", "site password required")
        }
        (PromptTarget::Site, PromptReason::Incorrect) => {
            ("site_password_incorrect", "site password incorrect")
        }
        (PromptTarget::Folder(_), PromptReason::Required) => {
            ("password_required", "folder password required")
        }
        (PromptTarget::Folder(_), PromptReason::Incorrect) => {
            ("password_incorrect", "folder password incorrect")
        }
    };
    let body = ErrorBody {
        error: error.into(),
        message: message.into(),
        prompt: Some(prompt),
    };
    json_response(StatusCode::UNAUTHORIZED, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (AccessError::Decryption, StatusCode::NOT_FOUND),
            (
                AccessError::SegmentNotFound {
                    segment: "a".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AccessError::InvalidChain {
                    segment: "a".into(),
                },
                StatusCode::NOT_FOUND,
            ),
            (
                AccessError::PasswordRequired {
                    folder: "f".into(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (AccessError::TokenExpired, StatusCode::UNAUTHORIZED),
            (AccessError::TokenInvalid, StatusCode::UNAUTHORIZED),
            (
                AccessError::Store(anyhow::anyhow!("boom")),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(
            ApiError::bad_request("x").status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn password_errors_carry_prompt() {
        let err = ApiError::from(AccessError::PasswordIncorrect {
            folder: "f".into(),
        });
        assert_eq!(
            err.prompt(),
            Some(Prompt::folder("f".into(), PromptReason::Incorrect))
        );
        assert_eq!(ApiError::from(AccessError::TokenExpired).prompt(), None);
    }

    #[test]
    fn store_details_are_hidden() {
        let err = ApiError::from(AccessError::Store(anyhow::anyhow!("drive said 1AbC")));
        assert!(!err.message().contains("1AbC"));
        let err = ApiError::from(anyhow::anyhow!("drive said 1AbC"));
        assert!(!err.message().contains("1AbC"));
    }
}
