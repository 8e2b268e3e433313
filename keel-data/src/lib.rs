//! # keel-data
//!
//! Data access core: describes record types once and derives searching,
//! projection and audit stamping from those descriptions.
//!
//! | Part | Entry point |
//! |------|-------------|
//! | Record catalog | [`Catalog`], [`RecordDescriptor`] |
//! | Mapping registry | [`MappingRegistry`], [`MappingRule`] |
//! | Dynamic query engine | [`QueryEngine`], [`FilterSpec`], [`SortSpec`], [`PageRequest`] |
//! | Audit interceptor | [`AuditInterceptor`], [`AuditContext`] |
//! | Query pipeline | [`DataCore`], [`DataService`] |
//! | Persistence contracts | [`RecordSource`], [`RecordSink`], [`InMemoryStore`] |
//! | SQL rendering | [`QueryBuilder`] |

pub mod audit;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod page;
pub mod pipeline;
pub mod query;
pub mod sort;
pub mod store;
pub mod value;

pub use audit::{AuditContext, AuditInterceptor, Clock, FixedClock, SystemClock};
pub use catalog::{Catalog, FieldDescriptor, FieldRole, LookupError, RecordDescriptor};
pub use config::DataSettings;
pub use engine::{QueryEngine, SearchQuery};
pub use entity::{FieldAccess, Projected, Record, Shape};
pub use error::DataError;
pub use filter::{FilterCondition, FilterOp, FilterSpec, Predicate};
pub use mapping::{MappingRegistry, MappingRule, Resolution};
pub use page::{Page, PageRequest, PageWindow};
pub use pipeline::{DataCore, DataCoreBuilder, DataService};
pub use query::{Dialect, IdentifierPolicy, QueryBuilder, QueryError};
pub use sort::{Direction, SortKey, SortOrder, SortSpec};
pub use store::{InMemoryStore, RecordSink, RecordSource, StoreError};
pub use value::{FieldType, FromValue, IntoValue, RecordId, Value};

pub mod prelude {
    //! Re-exports of the most commonly used data types.
    pub use crate::{
        AuditContext, DataCore, DataError, DataService, FieldAccess, FieldType, FilterSpec,
        InMemoryStore, MappingRule, Page, PageRequest, Projected, Record, RecordDescriptor,
        RecordId, RecordSink, RecordSource, Shape, SortSpec, Value,
    };
}
