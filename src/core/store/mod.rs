//! Named policy storage
//!
//! The [`PolicyStore`] persists policy text through a [`Storage`] backend,
//! keeps parsed policies in an LRU cache and resolves name sets into an
//! [`Acl`].
//!
//! Writers serialize on a single lock. Readers only take that lock on a
//! cache miss, and re-check the cache once they hold it so concurrent
//! misses load each policy from storage once.

mod builtin;
mod cache;
mod storage;

pub use builtin::{
    is_immutable, is_non_assignable, CONTROL_GROUP_POLICY_NAME, DEFAULT_POLICY,
    DEFAULT_POLICY_NAME, IMMUTABLE_POLICIES, NON_ASSIGNABLE_POLICIES,
    RESPONSE_WRAPPING_POLICY, RESPONSE_WRAPPING_POLICY_NAME,
};
pub use cache::PolicyCache;
pub use storage::{MemoryStorage, Storage};

use crate::core::acl::{Acl, Policy, PolicyType, ROOT_POLICY_NAME};
use crate::core::config::StoreConfig;
use crate::error::{Result, StoreError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Version written into new policy records
pub const POLICY_ENTRY_VERSION: u32 = 2;

/// Persisted form of a policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub version: u32,
    pub raw: String,
    #[serde(rename = "type", default)]
    pub policy_type: PolicyType,
}

/// Normalize a policy name: surrounding whitespace removed, lower-case
pub fn sanitize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Durable, cached store of named policies
pub struct PolicyStore {
    storage: Arc<dyn Storage>,
    prefix: String,
    cache: Option<PolicyCache>,
    modify_lock: Mutex<()>,
    root: Arc<Policy>,
}

impl PolicyStore {
    pub fn new(storage: Arc<dyn Storage>, config: &StoreConfig) -> Self {
        let cache = (!config.caching_disabled).then(|| PolicyCache::new(config.cache_size));

        PolicyStore {
            storage,
            prefix: config.storage_prefix.clone(),
            cache,
            modify_lock: Mutex::new(()),
            root: Arc::new(Policy::root()),
        }
    }

    /// Store backed by [`MemoryStorage`] with default settings
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), &StoreConfig::default())
    }

    /// Install the built-in policies
    pub fn setup(&self) -> Result<()> {
        self.load_builtin(DEFAULT_POLICY_NAME, DEFAULT_POLICY)?;
        self.load_builtin(RESPONSE_WRAPPING_POLICY_NAME, RESPONSE_WRAPPING_POLICY)?;
        Ok(())
    }

    /// Write a built-in policy unless it is already stored
    ///
    /// Immutable built-ins are rewritten whenever the stored text differs.
    pub fn load_builtin(&self, name: &str, text: &str) -> Result<()> {
        let name = sanitize_name(name);

        if let Some(existing) = self.get(&name)? {
            if !is_immutable(&name) || existing.raw == text {
                return Ok(());
            }
        }

        let mut policy = Policy::parse(text).map_err(|source| StoreError::Parse {
            name: name.clone(),
            source,
        })?;
        policy.name = name;
        policy.policy_type = PolicyType::Acl;
        self.set_internal(policy)
    }

    /// Fetch a policy by name
    ///
    /// `root` resolves to the in-memory root policy. A name with no stored
    /// record yields `Ok(None)`.
    pub fn get(&self, name: &str) -> Result<Option<Arc<Policy>>> {
        let name = sanitize_name(name);

        if name == ROOT_POLICY_NAME {
            return Ok(Some(Arc::clone(&self.root)));
        }

        if let Some(policy) = self.cached(&name) {
            return Ok(Some(policy));
        }

        let _guard = self.modify_lock.lock();

        // Another reader may have loaded it while we waited
        if let Some(policy) = self.cached(&name) {
            return Ok(Some(policy));
        }

        let Some(bytes) = self.storage.get(&self.key(&name))? else {
            return Ok(None);
        };

        let entry: PolicyEntry =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
                name: name.clone(),
                source,
            })?;

        if entry.policy_type != PolicyType::Acl {
            return Err(StoreError::UnsupportedPolicyType(entry.policy_type));
        }

        let mut policy = Policy::parse(&entry.raw).map_err(|source| StoreError::Parse {
            name: name.clone(),
            source,
        })?;
        // The storage key is authoritative over any name in the text
        policy.name = name.clone();

        let policy = Arc::new(policy);
        if let Some(cache) = &self.cache {
            cache.put(&name, Arc::clone(&policy));
        }

        debug!(name = %name, "loaded policy from storage");
        Ok(Some(policy))
    }

    /// Create or replace a policy
    ///
    /// Only `raw` is persisted. It is parsed again here and must yield the
    /// same rules the policy carries, otherwise the write is refused with
    /// [`StoreError::RulesMismatch`].
    pub fn set(&self, policy: Policy) -> Result<()> {
        let name = sanitize_name(&policy.name);
        if name.is_empty() {
            return Err(StoreError::MissingName);
        }
        if is_immutable(&name) {
            return Err(StoreError::Immutable { name, op: "update" });
        }
        if policy.policy_type != PolicyType::Acl {
            return Err(StoreError::UnsupportedPolicyType(policy.policy_type));
        }

        let mut parsed = Policy::parse(&policy.raw).map_err(|source| StoreError::Parse {
            name: name.clone(),
            source,
        })?;
        if parsed.rules != policy.rules {
            return Err(StoreError::RulesMismatch { name });
        }

        parsed.name = name;
        self.set_internal(parsed)
    }

    /// Persist a policy and refresh its cache entry, bypassing name checks
    pub(crate) fn set_internal(&self, policy: Policy) -> Result<()> {
        let _guard = self.modify_lock.lock();

        let entry = PolicyEntry {
            version: POLICY_ENTRY_VERSION,
            raw: policy.raw.clone(),
            policy_type: policy.policy_type,
        };
        let bytes = serde_json::to_vec(&entry).map_err(StoreError::Encode)?;
        self.storage.put(&self.key(&policy.name), &bytes)?;

        info!(name = %policy.name, rules = policy.rules.len(), "policy written");

        if let Some(cache) = &self.cache {
            let name = policy.name.clone();
            cache.remove(&name);
            cache.put(&name, Arc::new(policy));
        }

        Ok(())
    }

    /// Remove a policy
    ///
    /// Immutable policies and `default` cannot be deleted. Deleting a name
    /// that does not exist succeeds.
    pub fn delete(&self, name: &str) -> Result<()> {
        let name = sanitize_name(name);
        if is_immutable(&name) || name == DEFAULT_POLICY_NAME {
            return Err(StoreError::Immutable { name, op: "delete" });
        }

        let _guard = self.modify_lock.lock();
        self.storage.delete(&self.key(&name))?;
        if let Some(cache) = &self.cache {
            cache.remove(&name);
        }

        info!(name = %name, "policy deleted");
        Ok(())
    }

    /// Names of all assignable stored policies, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .storage
            .list(&self.prefix)?
            .into_iter()
            .filter(|name| !is_non_assignable(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Resolve policy names and merge them into an ACL
    ///
    /// Names with no stored policy are skipped.
    pub fn build_acl<S: AsRef<str>>(&self, names: &[S]) -> Result<Acl> {
        let mut policies = Vec::with_capacity(names.len());
        for name in names {
            match self.get(name.as_ref())? {
                Some(policy) => policies.push(policy),
                None => debug!(name = name.as_ref(), "policy not found, skipping"),
            }
        }

        Ok(Acl::new(policies.iter().map(Arc::as_ref))?)
    }

    /// Drop a cached policy after an external change and reload it
    ///
    /// Reload failures are logged, not returned; the next `get` retries.
    pub fn invalidate(&self, name: &str) {
        let name = sanitize_name(name.strip_prefix('/').unwrap_or(name));

        if let Some(cache) = &self.cache {
            cache.remove(&name);
        }

        if let Err(err) = self.get(&name) {
            error!(name = %name, error = %err, "failed to reload invalidated policy");
        }
    }

    /// Number of cached policies; zero when caching is disabled
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, PolicyCache::len)
    }

    fn cached(&self, name: &str) -> Option<Arc<Policy>> {
        self.cache.as_ref().and_then(|cache| cache.get(name))
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }
}
