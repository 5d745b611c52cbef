use {
    crate::{
        context::AccessContext,
        credentials::FolderPasswords,
        crypto::password_matches,
        resolver::PathChain,
        store::{EntryQuery, Store},
    },
    driveindex_protocol::{AccessError, OpaqueId},
    tracing::{debug, instrument},
};

/// Outcome of the folder password check for one path chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protection {
    /// No folder in the chain has a marker file.
    Unprotected,
    /// The nearest protected folder has no remembered password.
    PasswordRequired(OpaqueId),
    /// The remembered password does not match the marker file.
    PasswordIncorrect(OpaqueId),
    Unlocked,
}

impl Protection {
    #[inline]
    pub fn into_result(self) -> Result<(), AccessError> {
        match self {
            Self::Unprotected | Self::Unlocked => Ok(()),
            Self::PasswordRequired(folder) => Err(AccessError::PasswordRequired { folder }),
            Self::PasswordIncorrect(folder) => Err(AccessError::PasswordIncorrect { folder }),
        }
    }
}

/// Checks the password of the deepest folder in `chain` that contains a
/// marker file.
///
/// Marker files of shallower folders are ignored once a deeper one is found.
/// The marker file content is the password itself.
#[instrument(skip_all, fields(depth = chain.len()))]
pub async fn check_protection<S: Store>(
    ctx: &AccessContext,
    store: &S,
    chain: &PathChain,
    passwords: &FolderPasswords,
) -> Result<Protection, AccessError> {
    if chain.is_empty() {
        return Ok(Protection::Unprotected);
    }

    let query = EntryQuery::named(ctx.password_file_name())
        .with_parents(chain.segments().iter().map(|s| s.real_id.as_str()));
    let markers = store.list_entries(&query).await?;
    if markers.is_empty() {
        return Ok(Protection::Unprotected);
    }

    // Depth in the chain decides, not the order the store returned markers in.
    let Some((folder, marker)) = chain.segments().iter().rev().find_map(|segment| {
        markers
            .iter()
            .find(|marker| marker.parents.contains(&segment.real_id))
            .map(|marker| (segment, marker))
    }) else {
        return Ok(Protection::Unprotected);
    };

    let Some(remembered) = passwords.get(&folder.opaque_id) else {
        debug!(folder = %folder.opaque_id, "no remembered password");
        return Ok(Protection::PasswordRequired(folder.opaque_id.clone()));
    };
    let Ok(remembered) = ctx.cipher().decrypt_password(remembered.as_str()) else {
        debug!(folder = %folder.opaque_id, "remembered password is unreadable");
        return Ok(Protection::PasswordIncorrect(folder.opaque_id.clone()));
    };

    let secret = store.read_text(&marker.id).await?;
    if password_matches(&remembered, &secret) {
        Ok(Protection::Unlocked)
    } else {
        debug!(folder = %folder.opaque_id, "remembered password does not match");
        Ok(Protection::PasswordIncorrect(folder.opaque_id.clone()))
    }
}
