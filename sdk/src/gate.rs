use {
    crate::{
        context::AccessContext,
        credentials::{CredentialJar, CredentialStore},
        crypto::password_matches,
        protection::{Protection, check_protection},
        resolver::{PathChain, resolve_path_chain},
        store::Store,
        token::issue_token,
    },
    anyhow::Result,
    driveindex_protocol::{
        AccessError, OpaqueId, RequestPath,
        endpoints::{Prompt, PromptReason},
    },
    tracing::{info, instrument},
};

/// Terminal state of a credential-gated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allowed(PathChain),
    Prompt(Prompt),
}

/// Runs the full check for one request: site password, path chain, folder
/// passwords. Every request runs it from scratch.
pub struct Gate<'a, S> {
    ctx: &'a AccessContext,
    store: &'a S,
}

impl<'a, S: Store> Gate<'a, S> {
    #[inline]
    pub fn new(ctx: &'a AccessContext, store: &'a S) -> Self {
        Self { ctx, store }
    }

    /// Decides whether `path` may be served to a client holding `credentials`.
    ///
    /// A missing or broken path is an error; a missing or wrong password is a
    /// [`Access::Prompt`] naming what to ask for.
    #[instrument(skip_all, fields(%path))]
    pub async fn authorize<J: CredentialJar>(
        &self,
        path: &RequestPath,
        credentials: &CredentialStore<'_, J>,
    ) -> Result<Access, AccessError> {
        if let Some(prompt) = self.check_site(credentials) {
            info!(reason = ?prompt.reason, "site password prompt");
            return Ok(Access::Prompt(prompt));
        }

        let chain = resolve_path_chain(self.ctx, self.store, path)
            .await
            .inspect_err(|err| info!(kind = err.kind(), %err, "path rejected"))?;
        let passwords = credentials.folder_passwords();
        match check_protection(self.ctx, self.store, &chain, &passwords).await? {
            Protection::Unprotected | Protection::Unlocked => Ok(Access::Allowed(chain)),
            Protection::PasswordRequired(folder) => {
                info!(%folder, "folder password required");
                Ok(Access::Prompt(Prompt::folder(folder, PromptReason::Required)))
            }
            Protection::PasswordIncorrect(folder) => {
                info!(%folder, "folder password incorrect");
                Ok(Access::Prompt(Prompt::folder(folder, PromptReason::Incorrect)))
            }
        }
    }

    fn check_site<J: CredentialJar>(&self, credentials: &CredentialStore<'_, J>) -> Option<Prompt> {
        let expected = self.ctx.site_password()?;
        match credentials.site_password() {
            None => Some(Prompt::site(PromptReason::Required)),
            Some(remembered) if password_matches(&remembered, expected) => None,
            Some(_) => Some(Prompt::site(PromptReason::Incorrect)),
        }
    }

    /// Issues a download token with the configured lifetime.
    #[inline]
    pub fn issue_download_token(&self) -> Result<OpaqueId> {
        issue_token(self.ctx.cipher(), self.ctx.token_duration_hours())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{
            credentials::MemoryJar,
            fixtures::{Fixture, PRIVATE_PASSWORD},
            token::{TokenStatus, verify_token},
        },
        driveindex_protocol::endpoints::PromptTarget,
        std::str::FromStr,
    };

    fn path(s: &str) -> RequestPath {
        RequestPath::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn password_prompt_then_unlock() {
        let fx = Fixture::new();
        let gate = Gate::new(&fx.ctx, &fx.store);
        let mut credentials = CredentialStore::new(fx.ctx.cipher(), MemoryJar::new());

        let access = gate
            .authorize(&path("/docs/private/report.pdf"), &credentials)
            .await
            .unwrap();
        let Access::Prompt(prompt) = access else {
            panic!("expected a prompt, got {access:?}");
        };
        assert_eq!(prompt.reason, PromptReason::Required);
        let PromptTarget::Folder(folder) = prompt.target else {
            panic!("expected a folder prompt");
        };
        assert_eq!(fx.ctx.cipher().decrypt_id(&folder).unwrap(), fx.private);

        credentials
            .set_folder_password(&folder, "wrong")
            .unwrap();
        let access = gate
            .authorize(&path("/docs/private/report.pdf"), &credentials)
            .await
            .unwrap();
        assert_eq!(
            access,
            Access::Prompt(Prompt::folder(folder.clone(), PromptReason::Incorrect))
        );

        credentials
            .set_folder_password(&folder, PRIVATE_PASSWORD)
            .unwrap();
        let access = gate
            .authorize(&path("/docs/private/report.pdf"), &credentials)
            .await
            .unwrap();
        let Access::Allowed(chain) = access else {
            panic!("expected access, got {access:?}");
        };
        assert_eq!(chain.len(), 3);
    }

    #[tokio::test]
    async fn errors_are_not_prompts() {
        let fx = Fixture::new();
        let gate = Gate::new(&fx.ctx, &fx.store);
        let credentials = CredentialStore::new(fx.ctx.cipher(), MemoryJar::new());
        let err = gate
            .authorize(&path("/private/report.pdf"), &credentials)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::InvalidChain { .. }));
        let err = gate
            .authorize(&path("/missing"), &credentials)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::SegmentNotFound { .. }));
    }

    #[tokio::test]
    async fn private_index_mode() {
        let mut fx = Fixture::new();
        fx.ctx = fx.ctx.with_site_password("letmein");
        let gate = Gate::new(&fx.ctx, &fx.store);
        let mut credentials = CredentialStore::new(fx.ctx.cipher(), MemoryJar::new());

        for request in ["/", "/missing", "/other"] {
            let access = gate.authorize(&path(request), &credentials).await.unwrap();
            assert_eq!(
                access,
                Access::Prompt(Prompt::site(PromptReason::Required)),
                "{request}"
            );
        }

        credentials.set_site_password("nope").unwrap();
        let access = gate.authorize(&path("/other"), &credentials).await.unwrap();
        assert_eq!(access, Access::Prompt(Prompt::site(PromptReason::Incorrect)));

        credentials.set_site_password("letmein").unwrap();
        let access = gate.authorize(&path("/other"), &credentials).await.unwrap();
        assert!(matches!(access, Access::Allowed(_)));

        // Folder protection still applies behind the site password.
        let access = gate
            .authorize(&path("/docs/private"), &credentials)
            .await
            .unwrap();
        assert!(matches!(
            access,
            Access::Prompt(Prompt {
                target: PromptTarget::Folder(_),
                reason: PromptReason::Required
            })
        ));
    }

    #[tokio::test]
    async fn root_is_open_without_site_password() {
        let fx = Fixture::new();
        let gate = Gate::new(&fx.ctx, &fx.store);
        let credentials = CredentialStore::new(fx.ctx.cipher(), MemoryJar::new());
        let access = gate.authorize(&RequestPath::root(), &credentials).await.unwrap();
        assert_eq!(access, Access::Allowed(PathChain::default()));
    }

    #[test]
    fn issued_token_verifies() {
        let fx = Fixture::new();
        let gate = Gate::new(&fx.ctx, &fx.store);
        let token = gate.issue_download_token().unwrap();
        assert_eq!(verify_token(fx.ctx.cipher(), token.as_str()), TokenStatus::Valid);
    }
}
