use {
    super::{ContentStream, EntryQuery, Store},
    anyhow::{Context as _, Result},
    bytes::Bytes,
    driveindex_protocol::{Entry, FOLDER_MIME_TYPE},
    futures::stream,
    parking_lot::RwLock,
    std::sync::atomic::{AtomicUsize, Ordering},
};

#[derive(Debug)]
struct StoredEntry {
    entry: Entry,
    trashed: bool,
    content: Bytes,
}

/// Store kept entirely in memory, in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<Vec<StoredEntry>>,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry with an explicit id and returns that id.
    #[inline]
    pub fn insert(&self, entry: Entry, content: impl Into<Bytes>) -> String {
        let id = entry.id.clone();
        self.entries.write().push(StoredEntry {
            entry,
            trashed: false,
            content: content.into(),
        });
        id
    }

    #[inline]
    pub fn add_folder(&self, parent: &str, name: &str) -> String {
        let id = self.next_id();
        self.insert(
            Entry {
                id,
                name: name.into(),
                mime_type: FOLDER_MIME_TYPE.into(),
                parents: vec![parent.into()],
            },
            Bytes::new(),
        )
    }

    #[inline]
    pub fn add_file(&self, parent: &str, name: &str, content: impl Into<Bytes>) -> String {
        let id = self.next_id();
        self.insert(
            Entry {
                id,
                name: name.into(),
                mime_type: mime_type_for(name).into(),
                parents: vec![parent.into()],
            },
            content,
        )
    }

    #[inline]
    pub fn trash(&self, id: &str) -> Result<()> {
        let mut entries = self.entries.write();
        let stored = entries
            .iter_mut()
            .find(|stored| stored.entry.id == id)
            .with_context(|| format!("entry `{id}` not found"))?;
        stored.trashed = true;
        Ok(())
    }

    /// Number of `list_entries` calls served so far.
    #[must_use]
    #[inline]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    fn next_id(&self) -> String {
        format!("mem{:04}", self.entries.read().len())
    }

    fn content(&self, id: &str) -> Result<Bytes> {
        self.entries
            .read()
            .iter()
            .find(|stored| stored.entry.id == id && !stored.trashed)
            .map(|stored| stored.content.clone())
            .with_context(|| format!("entry `{id}` not found"))
    }
}

fn mime_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext) {
        Some("txt" | "password") => "text/plain",
        Some("md") => "text/markdown",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

impl Store for MemoryStore {
    async fn list_entries(&self, query: &EntryQuery) -> Result<Vec<Entry>> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|stored| query.matches(&stored.entry, stored.trashed))
            .map(|stored| stored.entry.clone())
            .collect())
    }

    async fn read_text(&self, id: &str) -> Result<String> {
        let content = self.content(id)?;
        Ok(String::from_utf8(content.to_vec())?)
    }

    async fn open_content(&self, id: &str) -> Result<ContentStream> {
        let content = self.content(id)?;
        Ok(Box::pin(stream::iter([Ok(content)])))
    }
}

#[cfg(test)]
mod tests {
    use {super::*, futures::TryStreamExt};

    #[tokio::test]
    async fn list_filters() {
        let store = MemoryStore::new();
        let docs = store.add_folder("root", "docs");
        let other = store.add_folder("root", "other");
        let report = store.add_file(&docs, "report.pdf", "pdf");
        let old = store.add_file(&docs, "old.txt", "old");
        store.add_file(&other, "report.pdf", "another");
        store.trash(&old).unwrap();

        let named = store
            .list_entries(&EntryQuery::named("report.pdf"))
            .await
            .unwrap();
        assert_eq!(named.len(), 2);
        assert_eq!(named.first().unwrap().id, report);

        let children = store
            .list_entries(&EntryQuery::children_of(docs.clone()))
            .await
            .unwrap();
        assert_eq!(children.len(), 1);

        let trashed = store
            .list_entries(&EntryQuery {
                trashed: true,
                ..EntryQuery::children_of(docs)
            })
            .await
            .unwrap();
        assert_eq!(trashed.first().unwrap().id, old);

        let either = store
            .list_entries(&EntryQuery::named("report.pdf").with_parents([other]))
            .await
            .unwrap();
        assert_eq!(either.len(), 1);
        assert_eq!(store.list_calls(), 4);
    }

    #[tokio::test]
    async fn content() {
        let store = MemoryStore::new();
        let file = store.add_file("root", ".password", "secret");
        assert_eq!(store.read_text(&file).await.unwrap(), "secret");
        let chunks: Vec<Bytes> = store
            .open_content(&file)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks, [Bytes::from("secret")]);
        store.read_text("missing").await.unwrap_err();
    }
}
