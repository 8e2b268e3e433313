//! Keel: a metadata-driven data access core.
//!
//! This facade crate re-exports the Keel sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use keel::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature     | Default | Crate                      |
//! |-------------|---------|----------------------------|
//! | `data`      | **yes** | `keel-data`                |
//! | `data-sqlx` | no      | `keel-data-sqlx`           |
//! | `sqlite`    | no      | `keel-data-sqlx/sqlite`    |
//! | `full`      | no      | All of the above           |
//!
//! # Startup
//!
//! ```ignore
//! keel::init_tracing();
//! let config = KeelConfig::load("dev")?.with_typed::<DataSettings>()?;
//! let core = DataCore::builder()
//!     .settings((*config).clone())
//!     .record::<Consignment>()
//!     .mapping(MappingRule::<Consignment, ConsignmentSummary>::new().copy_matching())
//!     .mapping(MappingRule::<Consignment, ConsignmentDetail>::new().copy_matching())
//!     .build()?;
//! let consignments = core.service::<Consignment, _>(InMemoryStore::new())?;
//! ```

pub extern crate keel_core;

// Re-export everything from keel-core at the top level for convenience.
pub use keel_core::*;

#[cfg(feature = "data")]
pub use keel_data;

#[cfg(feature = "data-sqlx")]
pub use keel_data_sqlx;

/// Convenience type aliases that depend on types from optional sub-crates.
pub mod types {
    /// Search result at the boundary: `Result<Page<T>, ApiError>`.
    ///
    /// ```ignore
    /// async fn list(&self, filter: &str, sort: &str) -> PagedResult<ConsignmentSummary> {
    ///     let filter = FilterSpec::parse(filter)?;
    ///     let sort = SortSpec::parse(sort)?;
    ///     let page = self.consignments.page_request(None, None);
    ///     Ok(self.consignments.search(&filter, &sort, &page).await?)
    /// }
    /// ```
    #[cfg(feature = "data")]
    pub type PagedResult<T> = Result<keel_data::Page<T>, keel_core::ApiError>;
}

/// Unified prelude. Import everything with `use keel::prelude::*`.
pub mod prelude {
    pub use crate::types::*;
    pub use keel_core::prelude::*;

    #[cfg(feature = "data")]
    pub use keel_data::prelude::*;
    #[cfg(feature = "data")]
    pub use keel_data::DataSettings;

    #[cfg(feature = "data-sqlx")]
    pub use keel_data_sqlx::prelude::*;
}
