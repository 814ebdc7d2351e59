//! Caching of parsed and validated GraphQL documents.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use apollo_compiler::ExecutableDocument;
use apollo_compiler::validation::Valid;

use self::storage::CacheStorage;
use crate::graphql;

pub(crate) mod storage;

/// The default number of documents kept by a [`DocumentCache`].
pub const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Identifies a parsed document.
///
/// Validation depends on the schema, so the schema name is part of the key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    /// The name of the schema the document was validated against.
    pub schema: String,
    /// The raw query text.
    pub query: String,
}

/// The outcome of parsing and validating a query text.
///
/// Invalid documents are kept as well, so that repeating a broken query does
/// not parse it again.
#[derive(Debug)]
pub enum PreparsedDocument {
    /// The document is valid against its schema.
    Valid(Valid<ExecutableDocument>),
    /// Syntax or validation errors.
    Invalid(Vec<graphql::Error>),
}

/// Provides parsed documents to an engine.
pub trait DocumentProvider: Send + Sync {
    /// Returns the document for `key`, calling `parse` when it is not known yet.
    fn get_or_parse(
        &self,
        key: &DocumentKey,
        parse: &mut dyn FnMut() -> PreparsedDocument,
    ) -> Arc<PreparsedDocument>;
}

/// Hit and miss counters of a [`DocumentCache`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to parse.
    pub misses: u64,
}

/// A bounded, least-recently-used cache of parsed documents.
///
/// Two requests racing on the same unknown query may both parse it; the last
/// insert wins.
pub struct DocumentCache {
    storage: CacheStorage<DocumentKey, Arc<PreparsedDocument>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DocumentCache {
    /// Creates a cache holding at most `capacity` documents.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            storage: CacheStorage::new(capacity),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The number of documents currently cached.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the cache holds no document.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The maximum number of documents kept.
    pub fn capacity(&self) -> NonZeroUsize {
        self.storage.capacity()
    }

    /// Lookup counters since creation.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl Default for DocumentCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DocumentProvider for DocumentCache {
    fn get_or_parse(
        &self,
        key: &DocumentKey,
        parse: &mut dyn FnMut() -> PreparsedDocument,
    ) -> Arc<PreparsedDocument> {
        if let Some(document) = self.storage.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(schema = %key.schema, "document cache hit");
            return document;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(schema = %key.schema, "document cache miss");

        let document = Arc::new(parse());
        self.storage.insert(key.clone(), document.clone());
        document
    }
}
