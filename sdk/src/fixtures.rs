use {
    crate::{context::AccessContext, crypto::Cipher, store::MemoryStore},
    driveindex_protocol::EncryptionKey,
};

pub const ROOT_ID: &str = "0ARootFolder";
pub const PRIVATE_PASSWORD: &str = "hunter2";

/// ```text
/// root
/// ├── docs
/// │   └── private          (.password = hunter2)
/// │       └── report.pdf
/// └── other
///     └── elsewhere
/// ```
pub struct Fixture {
    pub ctx: AccessContext,
    pub store: MemoryStore,
    pub docs: String,
    pub private: String,
    pub report: String,
    pub other: String,
    pub elsewhere: String,
}

impl Fixture {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let docs = store.add_folder(ROOT_ID, "docs");
        let private = store.add_folder(&docs, "private");
        let report = store.add_file(&private, "report.pdf", "%PDF-1.7");
        store.add_file(&private, ".password", PRIVATE_PASSWORD);
        let other = store.add_folder(ROOT_ID, "other");
        let elsewhere = store.add_folder(&other, "elsewhere");
        let key = EncryptionKey::generate().unwrap();
        Self {
            ctx: AccessContext::new(Cipher::new(&key), ROOT_ID),
            store,
            docs,
            private,
            report,
            other,
            elsewhere,
        }
    }
}
