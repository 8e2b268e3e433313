//! Dynamic query engine.
//!
//! [`QueryEngine::prepare`] resolves caller-supplied filter, sort and page
//! specifications against the [`Catalog`] into a [`SearchQuery`]. A store
//! either evaluates that query in memory with [`SearchQuery::run`] or renders
//! it to SQL with [`QueryBuilder::for_search`](crate::QueryBuilder::for_search).

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::entity::FieldAccess;
use crate::error::DataError;
use crate::filter::{FilterSpec, Predicate};
use crate::page::{PageRequest, PageWindow};
use crate::sort::{SortOrder, SortSpec};

/// A fully resolved, type-checked search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    record_type: &'static str,
    storage_name: &'static str,
    columns: Vec<&'static str>,
    filters: Vec<Predicate>,
    order: SortOrder,
    window: PageWindow,
}

impl SearchQuery {
    pub fn record_type(&self) -> &'static str {
        self.record_type
    }

    pub fn storage_name(&self) -> &'static str {
        self.storage_name
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn order(&self) -> &SortOrder {
        &self.order
    }

    pub fn window(&self) -> &PageWindow {
        &self.window
    }

    /// Evaluate in memory: filter, then sort, then paginate.
    pub fn run<R: FieldAccess>(&self, source: impl IntoIterator<Item = R>) -> (Vec<R>, u64) {
        let mut matched = apply_filters(source, &self.filters);
        apply_sort(&mut matched, &self.order);
        paginate(matched, &self.window)
    }
}

/// Resolves search specifications against the catalog.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    catalog: Arc<Catalog>,
    max_page_size: u64,
}

impl QueryEngine {
    pub fn new(catalog: Arc<Catalog>, max_page_size: u64) -> Self {
        Self {
            catalog,
            max_page_size,
        }
    }

    pub fn max_page_size(&self) -> u64 {
        self.max_page_size
    }

    /// Resolve every condition. One bad condition rejects the whole filter.
    pub fn build_filters(
        &self,
        record_type: &str,
        spec: &FilterSpec,
    ) -> Result<Vec<Predicate>, DataError> {
        let descriptor = self.catalog.descriptor(record_type)?;
        spec.conditions()
            .iter()
            .map(|condition| Predicate::resolve(descriptor, condition))
            .collect()
    }

    pub fn build_sort(&self, record_type: &str, spec: &SortSpec) -> Result<SortOrder, DataError> {
        let descriptor = self.catalog.descriptor(record_type)?;
        SortOrder::resolve(descriptor, spec)
    }

    /// Resolve a complete search. Nothing is executed here.
    pub fn prepare(
        &self,
        record_type: &str,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> Result<SearchQuery, DataError> {
        let descriptor = self.catalog.descriptor(record_type)?;
        let filters = self.build_filters(record_type, filter)?;
        let order = self.build_sort(record_type, sort)?;
        let window = page.window(self.max_page_size)?;
        Ok(SearchQuery {
            record_type: descriptor.type_name(),
            storage_name: descriptor.storage_name(),
            columns: descriptor.field_names(),
            filters,
            order,
            window,
        })
    }
}

/// Keep the records that satisfy every predicate (logical AND).
///
/// An empty predicate list keeps everything.
pub fn apply_filters<R: FieldAccess>(
    source: impl IntoIterator<Item = R>,
    predicates: &[Predicate],
) -> Vec<R> {
    source
        .into_iter()
        .filter(|record| predicates.iter().all(|p| p.matches(record)))
        .collect()
}

/// Stable composite sort.
pub fn apply_sort<R: FieldAccess>(source: &mut [R], order: &SortOrder) {
    source.sort_by(|a, b| order.compare(a, b));
}

/// Slice one page out of an ordered set, returning it with the set's size.
///
/// A page past the end yields no items but still reports the full count.
pub fn paginate<R>(ordered: Vec<R>, window: &PageWindow) -> (Vec<R>, u64) {
    let total = ordered.len() as u64;
    let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
    let size = usize::try_from(window.size()).unwrap_or(usize::MAX);
    let items = ordered.into_iter().skip(offset).take(size).collect();
    (items, total)
}
