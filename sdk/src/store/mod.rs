//! Backing file store.
//!
//! The access layer only needs three operations from the store: a filtered
//! listing, reading a small text file (password markers), and streaming file
//! content for downloads.

mod drive;
mod memory;

pub use self::{
    drive::{DriveConfig, DriveStore},
    memory::MemoryStore,
};

use {
    anyhow::Result,
    bytes::Bytes,
    driveindex_protocol::Entry,
    futures::Stream,
    std::{future::Future, pin::Pin},
};

pub type ContentStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Filter for [`Store::list_entries`]. All present conditions must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Exact name match.
    pub name: Option<String>,
    /// Entry must have at least one of these parents. Empty means any parent.
    pub parents: Vec<String>,
    pub trashed: bool,
}

impl EntryQuery {
    #[must_use]
    #[inline]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    #[inline]
    pub fn children_of(parent: impl Into<String>) -> Self {
        Self {
            parents: vec![parent.into()],
            ..Self::default()
        }
    }

    #[must_use]
    #[inline]
    pub fn with_parents<I>(mut self, parents: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    #[inline]
    pub fn matches(&self, entry: &Entry, trashed: bool) -> bool {
        self.trashed == trashed
            && self.name.as_ref().is_none_or(|name| *name == entry.name)
            && (self.parents.is_empty()
                || entry.parents.iter().any(|parent| self.parents.contains(parent)))
    }
}

pub trait Store: Send + Sync {
    /// Returns matching entries in the store's own order.
    fn list_entries(&self, query: &EntryQuery) -> impl Future<Output = Result<Vec<Entry>>> + Send;

    fn read_text(&self, id: &str) -> impl Future<Output = Result<String>> + Send;

    fn open_content(&self, id: &str) -> impl Future<Output = Result<ContentStream>> + Send;
}
