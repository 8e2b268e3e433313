use std::marker::PhantomData;
use std::sync::Arc;

use crate::audit::{AuditContext, AuditInterceptor};
use crate::catalog::Catalog;
use crate::config::DataSettings;
use crate::engine::QueryEngine;
use crate::entity::{Projected, Record, Shape};
use crate::error::DataError;
use crate::filter::FilterSpec;
use crate::mapping::{MappingRegistry, MappingRule};
use crate::page::{Page, PageRequest};
use crate::sort::SortSpec;
use crate::store::{RecordSink, RecordSource};
use crate::value::RecordId;

type DeferredMapping = Box<dyn FnOnce(&mut MappingRegistry) -> Result<(), DataError>>;

/// Startup composition of record types, mappings and settings.
///
/// Registration problems are collected and reported by [`build`](Self::build),
/// which must succeed before any request is served.
///
/// ```ignore
/// let core = DataCore::builder()
///     .settings(settings)
///     .record::<Consignment>()
///     .mapping(MappingRule::<Consignment, ConsignmentSummary>::new().copy_matching())
///     .mapping(MappingRule::<Consignment, ConsignmentDetail>::new().copy_matching())
///     .build()?;
/// let consignments = core.service::<Consignment, _>(InMemoryStore::new())?;
/// ```
pub struct DataCoreBuilder {
    catalog: Catalog,
    mappings: Vec<DeferredMapping>,
    settings: DataSettings,
    error: Option<DataError>,
}

impl DataCoreBuilder {
    fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            mappings: Vec::new(),
            settings: DataSettings::default(),
            error: None,
        }
    }

    fn record_error(&mut self, result: Result<(), DataError>) {
        if let (Err(err), None) = (result, &self.error) {
            self.error = Some(err);
        }
    }

    pub fn settings(mut self, settings: DataSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn record<R: Record>(mut self) -> Self {
        let result = self.catalog.register_record::<R>();
        self.record_error(result);
        self
    }

    pub fn mapping<R: Record, S: Shape>(mut self, rule: MappingRule<R, S>) -> Self {
        self.mappings
            .push(Box::new(move |registry| registry.register(rule)));
        self
    }

    pub fn build(self) -> Result<DataCore, DataError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.settings
            .validate()
            .map_err(|e| DataError::Configuration(e.to_string()))?;

        let catalog = Arc::new(self.catalog);
        let mut registry = MappingRegistry::new(Arc::clone(&catalog));
        for register in self.mappings {
            register(&mut registry)?;
        }
        Ok(DataCore {
            catalog,
            mappings: Arc::new(registry),
            settings: self.settings,
        })
    }
}

/// The validated, read-only data core shared by every service.
#[derive(Debug, Clone)]
pub struct DataCore {
    catalog: Arc<Catalog>,
    mappings: Arc<MappingRegistry>,
    settings: DataSettings,
}

impl DataCore {
    pub fn builder() -> DataCoreBuilder {
        DataCoreBuilder::new()
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn mappings(&self) -> &Arc<MappingRegistry> {
        &self.mappings
    }

    pub fn settings(&self) -> &DataSettings {
        &self.settings
    }

    pub fn engine(&self) -> QueryEngine {
        QueryEngine::new(Arc::clone(&self.catalog), self.settings.max_page_size)
    }

    pub fn interceptor(&self) -> AuditInterceptor {
        AuditInterceptor::new(
            Arc::clone(&self.catalog),
            self.settings.system_identity.clone(),
        )
    }

    /// Build the service for `R` over `store`.
    ///
    /// Fails when `R` is not registered or either canonical mapping is missing.
    pub fn service<R, St>(&self, store: St) -> Result<DataService<R, St>, DataError>
    where
        R: Projected,
        St: RecordSource<R> + RecordSink<R>,
    {
        if !self.catalog.contains(R::type_name()) {
            return Err(DataError::Configuration(format!(
                "record type '{}' is not registered",
                R::type_name()
            )));
        }
        for (present, shape) in [
            (
                self.mappings.contains::<R, R::Reduced>(),
                <R::Reduced as Shape>::shape_name(),
            ),
            (
                self.mappings.contains::<R, R::Detailed>(),
                <R::Detailed as Shape>::shape_name(),
            ),
        ] {
            if !present {
                return Err(DataError::Configuration(format!(
                    "no mapping registered for {} -> {shape}",
                    R::type_name()
                )));
            }
        }
        Ok(DataService {
            mappings: Arc::clone(&self.mappings),
            engine: self.engine(),
            audit: self.interceptor(),
            default_page_size: self.settings.default_page_size,
            store,
            _record: PhantomData,
        })
    }
}

/// Search, read, create and update for one record type.
pub struct DataService<R, St> {
    mappings: Arc<MappingRegistry>,
    engine: QueryEngine,
    audit: AuditInterceptor,
    default_page_size: u64,
    store: St,
    _record: PhantomData<fn() -> R>,
}

impl<R, St> DataService<R, St>
where
    R: Projected,
    St: RecordSource<R> + RecordSink<R>,
{
    pub fn store(&self) -> &St {
        &self.store
    }

    /// Page request with the configured default size filled in.
    pub fn page_request(&self, page: Option<u64>, size: Option<u64>) -> PageRequest {
        PageRequest::new(page.unwrap_or(1), size.unwrap_or(self.default_page_size))
    }

    /// Filter, sort, paginate, then map each record to its reduced shape.
    ///
    /// Nothing is persisted, so abandoning the future at any point is safe.
    pub async fn search(
        &self,
        filter: &FilterSpec,
        sort: &SortSpec,
        page: &PageRequest,
    ) -> Result<Page<R::Reduced>, DataError> {
        let query = self.engine.prepare(R::type_name(), filter, sort, page)?;
        let (records, total) = self.store.search(&query).await?;
        tracing::debug!(
            record = R::type_name(),
            filters = query.filters().len(),
            page = query.window().page(),
            returned = records.len(),
            total,
            "search executed"
        );
        Page::new(records, query.window(), total)
            .try_map(|record| self.mappings.to_shape::<R, R::Reduced>(&record))
    }

    /// Read one record as its detailed shape.
    pub async fn find(&self, id: &RecordId) -> Result<R::Detailed, DataError> {
        let record = self.load(id).await?;
        self.mappings.to_shape::<R, R::Detailed>(&record)
    }

    /// Persist a new record. The identifier is generated here, once.
    pub async fn create(
        &self,
        ctx: &AuditContext,
        shape: &R::Detailed,
    ) -> Result<RecordId, DataError> {
        let mut record: R = self.mappings.to_record::<R, R::Detailed>(shape, None)?;
        let id = RecordId::generate();
        record.set_id(id);
        self.audit.stamp_create(ctx, &mut record)?;
        self.store.insert(&record).await?;
        tracing::debug!(record = R::type_name(), %id, "record created");
        Ok(id)
    }

    /// Overwrite the writable fields of an existing record.
    ///
    /// Identifier and creation metadata are kept from the stored record.
    pub async fn update(
        &self,
        ctx: &AuditContext,
        id: &RecordId,
        shape: &R::Detailed,
    ) -> Result<(), DataError> {
        let existing = self.load(id).await?;
        let mut record: R = self
            .mappings
            .to_record::<R, R::Detailed>(shape, Some(&existing))?;
        record.set_id(*id);
        self.audit.stamp_update(ctx, &mut record, &existing)?;
        if !self.store.update(&record).await? {
            return Err(not_found::<R>(id));
        }
        tracing::debug!(record = R::type_name(), %id, "record updated");
        Ok(())
    }

    async fn load(&self, id: &RecordId) -> Result<R, DataError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| not_found::<R>(id))
    }
}

fn not_found<R: Record>(id: &RecordId) -> DataError {
    DataError::NotFound(format!("{} {id}", R::type_name()))
}
