//! Durable storage collaborator
//!
//! The store only needs a flat key/value namespace. Encryption, replication
//! and durability are the backend's business.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;

/// Key/value backend holding policy records
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()>;

    /// Deleting a missing key is not an error
    fn delete(&self, key: &str) -> io::Result<()>;

    /// Keys under `prefix`, with the prefix removed
    fn list(&self, prefix: &str) -> io::Result<Vec<String>>;
}

/// In-process storage backend
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> io::Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn list(&self, prefix: &str) -> io::Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key[prefix.len()..].to_string())
            .collect())
    }
}
