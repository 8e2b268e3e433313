use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::engine::SearchQuery;
use crate::entity::Record;
use crate::error::DataError;
use crate::value::RecordId;

/// Queryable side of the persistence collaborator.
///
/// `search` applies the query's predicates, ordering and window, and returns
/// one page together with the size of the filtered set.
///
/// Uses RPITIT (return-position `impl Trait` in traits), no `async-trait` needed.
pub trait RecordSource<R: Record>: Send + Sync {
    fn search(
        &self,
        query: &SearchQuery,
    ) -> impl Future<Output = Result<(Vec<R>, u64), DataError>> + Send;

    fn find_by_id(
        &self,
        id: &RecordId,
    ) -> impl Future<Output = Result<Option<R>, DataError>> + Send;
}

/// Write side of the persistence collaborator, keyed by identifier.
pub trait RecordSink<R: Record>: Send + Sync {
    fn insert(&self, record: &R) -> impl Future<Output = Result<(), DataError>> + Send;

    /// Replace the stored record. `false` when no record has that identifier.
    fn update(&self, record: &R) -> impl Future<Output = Result<bool, DataError>> + Send;
}

/// Write rejections raised by [`InMemoryStore`], surfaced as [`DataError::Store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The record reached the store without an assigned identifier.
    MissingIdentifier { record: &'static str },
    /// A record with the same identifier is already stored.
    DuplicateKey { record: &'static str, id: RecordId },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::MissingIdentifier { record } => {
                write!(f, "{record} has no identifier")
            }
            StoreError::DuplicateKey { record, id } => write!(f, "{record} {id} already exists"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Concurrent in-memory store.
///
/// Each update replaces the whole record under the entry lock, so racing
/// updates end in one of the written states (last write wins).
pub struct InMemoryStore<R> {
    records: Arc<DashMap<RecordId, R>>,
}

impl<R> InMemoryStore<R> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R> Default for InMemoryStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for InMemoryStore<R> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<R: Record> InMemoryStore<R> {
    /// Snapshot of every stored record, in no particular order.
    pub fn snapshot(&self) -> Vec<R> {
        self.records.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl<R: Record> RecordSource<R> for InMemoryStore<R> {
    async fn search(&self, query: &SearchQuery) -> Result<(Vec<R>, u64), DataError> {
        Ok(query.run(self.snapshot()))
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<R>, DataError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }
}

impl<R: Record> RecordSink<R> for InMemoryStore<R> {
    async fn insert(&self, record: &R) -> Result<(), DataError> {
        let id = record.id();
        if !id.is_assigned() {
            return Err(DataError::store(StoreError::MissingIdentifier {
                record: R::type_name(),
            }));
        }
        match self.records.entry(id) {
            Entry::Occupied(_) => Err(DataError::store(StoreError::DuplicateKey {
                record: R::type_name(),
                id,
            })),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, record: &R) -> Result<bool, DataError> {
        match self.records.get_mut(&record.id()) {
            Some(mut entry) => {
                *entry = record.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
