//! Path chain resolution.
//!
//! Each segment is looked up by name independently and concurrently, then the
//! results are checked in path order: the first segment must be a child of the
//! root folder and every following segment a child of the one before it.

use {
    crate::{
        context::AccessContext,
        crypto::is_parent_link,
        store::{EntryQuery, Store},
    },
    derivative::Derivative,
    driveindex_protocol::{AccessError, Entry, OpaqueId, PathSegment, RequestPath},
    futures::future::try_join_all,
    tracing::{instrument, warn},
};

/// A store entry matched to one segment of the requested path.
#[derive(Derivative, Clone, PartialEq, Eq)]
#[derivative(Debug)]
pub struct ResolvedSegment {
    pub name: String,
    /// Path from the root folder up to and including this segment.
    pub path: String,
    #[derivative(Debug = "ignore")]
    pub real_id: String,
    #[derivative(Debug = "ignore")]
    pub parent_real_id: String,
    pub mime_type: String,
    /// `real_id` in the form that may be handed out to clients.
    pub opaque_id: OpaqueId,
}

impl ResolvedSegment {
    #[must_use]
    #[inline]
    pub fn is_folder(&self) -> bool {
        self.mime_type == driveindex_protocol::FOLDER_MIME_TYPE
    }
}

/// Verified sequence of entries from the root folder to the requested path.
///
/// Index 0 is a child of the root folder. Empty for the root folder itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathChain(Vec<ResolvedSegment>);

impl PathChain {
    #[must_use]
    #[inline]
    pub fn segments(&self) -> &[ResolvedSegment] {
        &self.0
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

    #[must_use]
    #[inline]
    pub fn last(&self) -> Option<&ResolvedSegment> {
        self.0.last()
    }

    /// Real id of the deepest element, or of the root folder for an empty chain.
    #[must_use]
    #[inline]
    pub fn target_id<'a>(&'a self, ctx: &'a AccessContext) -> &'a str {
        self.0
            .last()
            .map_or(ctx.root_id(), |segment| segment.real_id.as_str())
    }
}

/// Resolves `path` into a [`PathChain`] rooted at the configured root folder.
///
/// Fails with [`AccessError::SegmentNotFound`] if some segment has no
/// non-trashed entry with that name, and with [`AccessError::InvalidChain`]
/// at the first segment that is not a child of its predecessor. Nothing past
/// a broken link is examined.
#[instrument(skip_all, fields(%path))]
pub async fn resolve_path_chain<S: Store>(
    ctx: &AccessContext,
    store: &S,
    path: &RequestPath,
) -> Result<PathChain, AccessError> {
    let candidates =
        try_join_all(path.segments().iter().map(|segment| lookup(store, segment))).await?;

    let mut chain = Vec::with_capacity(candidates.len());
    let mut expected_parent = ctx.root_id().to_owned();
    let mut current_path = String::new();
    for (segment, matches) in path.segments().iter().zip(candidates) {
        if matches.len() > 1 {
            warn!(
                segment = %segment.name,
                count = matches.len(),
                "several entries share this name, using the first one linked to the parent"
            );
        }
        let Some(entry) = matches
            .into_iter()
            .find(|entry| is_parent_link(entry.parent(), &expected_parent))
        else {
            warn!(segment = %segment.name, "path segment is not linked to its parent");
            return Err(AccessError::InvalidChain {
                segment: segment.name.clone(),
            });
        };

        current_path.push('/');
        current_path.push_str(&segment.name);
        let opaque_id = ctx.cipher().encrypt_id(&entry.id)?;
        expected_parent.clone_from(&entry.id);
        chain.push(ResolvedSegment {
            name: segment.name.clone(),
            path: current_path.clone(),
            parent_real_id: entry.parent().unwrap_or_default().to_owned(),
            real_id: entry.id,
            mime_type: entry.mime_type,
            opaque_id,
        });
    }
    Ok(PathChain(chain))
}

async fn lookup<S: Store>(store: &S, segment: &PathSegment) -> Result<Vec<Entry>, AccessError> {
    let matches = store
        .list_entries(&EntryQuery::named(segment.name.as_str()))
        .await?;
    if matches.is_empty() {
        return Err(AccessError::SegmentNotFound {
            segment: segment.name.clone(),
        });
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::fixtures::{Fixture, ROOT_ID},
        std::str::FromStr,
    };

    fn path(s: &str) -> RequestPath {
        RequestPath::from_str(s).unwrap()
    }

    #[tokio::test]
    async fn resolves_valid_chain() {
        let fx = Fixture::new();
        let chain = resolve_path_chain(&fx.ctx, &fx.store, &path("/docs/private/report.pdf"))
            .await
            .unwrap();
        assert_eq!(chain.len(), 3);
        let segments = chain.segments();
        let ids: Vec<_> = segments.iter().map(|s| s.real_id.as_str()).collect();
        assert_eq!(ids, [fx.docs.as_str(), &fx.private, &fx.report]);
        let parents: Vec<_> = segments.iter().map(|s| s.parent_real_id.as_str()).collect();
        assert_eq!(parents, [ROOT_ID, &fx.docs, &fx.private]);
        assert_eq!(chain.last().unwrap().path, "/docs/private/report.pdf");
        for segment in segments {
            assert_eq!(
                fx.ctx.cipher().decrypt_id(&segment.opaque_id).unwrap(),
                segment.real_id
            );
        }
        assert!(segments.first().unwrap().is_folder());
        assert!(!chain.last().unwrap().is_folder());
    }

    #[tokio::test]
    async fn root_is_empty_chain() {
        let fx = Fixture::new();
        let chain = resolve_path_chain(&fx.ctx, &fx.store, &RequestPath::root())
            .await
            .unwrap();
        assert!(chain.is_empty());
        assert_eq!(chain.target_id(&fx.ctx), ROOT_ID);
    }

    #[tokio::test]
    async fn missing_segment() {
        let fx = Fixture::new();
        let err = resolve_path_chain(&fx.ctx, &fx.store, &path("/docs/nope/report.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::SegmentNotFound { segment } if segment == "nope"));
    }

    #[tokio::test]
    async fn broken_link_at_any_depth() {
        let fx = Fixture::new();
        // `elsewhere` exists, but under `other`, not under the root.
        for (request, offending) in [
            ("/elsewhere", "elsewhere"),
            ("/docs/elsewhere", "elsewhere"),
            ("/docs/private/elsewhere", "elsewhere"),
            ("/private", "private"),
            ("/docs/report.pdf", "report.pdf"),
            ("/other/private/report.pdf", "private"),
        ] {
            let err = resolve_path_chain(&fx.ctx, &fx.store, &path(request))
                .await
                .unwrap_err();
            assert!(
                matches!(&err, AccessError::InvalidChain { segment } if segment == offending),
                "{request}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn trashed_entries_are_invisible() {
        let fx = Fixture::new();
        fx.store.trash(&fx.report).unwrap();
        let err = resolve_path_chain(&fx.ctx, &fx.store, &path("/docs/private/report.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::SegmentNotFound { .. }));
    }

    #[tokio::test]
    async fn duplicate_names_follow_the_chain() {
        let fx = Fixture::new();
        // A second `notes` folder, created first, under an unrelated parent.
        let stray = fx.store.add_folder(&fx.other, "notes");
        let notes = fx.store.add_folder(&fx.docs, "notes");
        let chain = resolve_path_chain(&fx.ctx, &fx.store, &path("/docs/notes"))
            .await
            .unwrap();
        assert_eq!(chain.last().unwrap().real_id, notes);
        assert_ne!(notes, stray);
    }

    #[test]
    fn debug_hides_real_ids() {
        let segment = ResolvedSegment {
            name: "docs".into(),
            path: "/docs".into(),
            real_id: "1RealDocsId".into(),
            parent_real_id: "0RootId".into(),
            mime_type: driveindex_protocol::FOLDER_MIME_TYPE.into(),
            opaque_id: "opaque".into(),
        };
        let debug = format!("{segment:?}");
        assert!(!debug.contains("1RealDocsId"));
        assert!(!debug.contains("0RootId"));
        assert!(debug.contains("opaque"));
    }
}
