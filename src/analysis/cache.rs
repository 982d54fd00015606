// Content-addressed cache of built structures
//
// Keyed by the SHA-256 of (repo, commit); evicts least recently used
// entries once the estimated byte size of all entries exceeds the budget.

use crate::analysis::structure::RepoStructure;
use crate::config::CacheConfig;
use crate::error::Result;
use crate::parser::FileEntry;
use lru::LruCache;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

/// Approximate heap footprint, used to weight cache entries
pub trait EstimateSize {
    fn estimated_size_bytes(&self) -> usize;
}

impl EstimateSize for FileEntry {
    fn estimated_size_bytes(&self) -> usize {
        let names: usize = self
            .classes
            .iter()
            .map(|c| c.name.len() + c.methods.iter().map(|m| m.name.len() + 64).sum::<usize>() + 64)
            .sum::<usize>()
            + self.functions.iter().map(|f| f.name.len() + 64).sum::<usize>()
            + self.variables.iter().map(String::len).sum::<usize>();
        self.path.len() + self.text.len() + names + 32 * (self.imports.len() + self.references.len())
    }
}

impl EstimateSize for RepoStructure {
    fn estimated_size_bytes(&self) -> usize {
        self.files().map(|f| f.estimated_size_bytes()).sum()
    }
}

/// SHA-256 of a `(repo, commit)` pair, hex encoded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_commit(repo: &str, commit: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(repo.as_bytes());
        hasher.update([0u8]);
        hasher.update(commit.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// LRU cache of structures bounded by estimated byte size
pub struct StructureCache {
    entries: LruCache<CacheKey, (Arc<RepoStructure>, usize)>,
    max_bytes: usize,
    used_bytes: usize,
    hits: u64,
    misses: u64,
}

impl StructureCache {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            entries: LruCache::unbounded(),
            max_bytes,
            used_bytes: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_bytes)
    }

    /// Look up a structure, marking it most recently used
    pub fn get(&mut self, key: &CacheKey) -> Option<Arc<RepoStructure>> {
        match self.entries.get(key) {
            Some((structure, _)) => {
                self.hits += 1;
                Some(Arc::clone(structure))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a structure, evicting older entries to stay within budget.
    ///
    /// A structure larger than the whole budget is returned but not cached.
    pub fn insert(&mut self, key: CacheKey, structure: RepoStructure) -> Arc<RepoStructure> {
        let size = structure.estimated_size_bytes();
        let structure = Arc::new(structure);

        if let Some((_, old_size)) = self.entries.pop(&key) {
            self.used_bytes -= old_size;
        }
        if size > self.max_bytes {
            debug!(key = key.as_str(), size, "Structure exceeds cache budget, not cached");
            return structure;
        }

        while self.used_bytes + size > self.max_bytes {
            match self.entries.pop_lru() {
                Some((evicted, (_, evicted_size))) => {
                    debug!(key = evicted.as_str(), size = evicted_size, "Evicted cached structure");
                    self.used_bytes -= evicted_size;
                }
                None => break,
            }
        }

        self.used_bytes += size;
        self.entries.put(key, (Arc::clone(&structure), size));
        structure
    }

    /// Return the cached structure or build, cache and return it
    pub fn get_or_build<F>(&mut self, key: CacheKey, build: F) -> Result<Arc<RepoStructure>>
    where
        F: FnOnce() -> Result<RepoStructure>,
    {
        if let Some(structure) = self.get(&key) {
            return Ok(structure);
        }
        let structure = build()?;
        Ok(self.insert(key, structure))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.used_bytes = 0;
    }
}
