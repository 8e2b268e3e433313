//! # keel-data-sqlx: SQLx backend for the Keel data core
//!
//! This crate provides the [SQLx](https://github.com/launchbadge/sqlx)-specific
//! persistence collaborator for `keel-data`. It implements the
//! [`RecordSource`](keel_data::RecordSource) and
//! [`RecordSink`](keel_data::RecordSink) contracts on top of a connection
//! pool, and bridges `sqlx::Error` into `DataError`.
//!
//! # What's in this crate
//!
//! | Type | Description |
//! |------|-------------|
//! | `SqliteStore` | Record store over an `sqlx::SqlitePool` (feature `sqlite`) |
//! | [`SqlxErrorExt`] | Extension trait to convert `sqlx::Error` → `DataError` (`.into_data_error()`) |
//! | [`SqlxResult<T>`] | Type alias for `Result<T, DataError>` |
//!
//! # Feature flags
//!
//! | Feature    | Driver |
//! |------------|--------|
//! | `sqlite`   | SQLite via `sqlx/sqlite` |
//!
//! # Quick start
//!
//! ```toml
//! [dependencies]
//! keel-data-sqlx = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! ```ignore
//! use keel_data_sqlx::SqliteStore;
//!
//! let store = SqliteStore::<Consignment>::new(pool.clone())?;
//! store.create_table().await?;
//! let consignments = core.service::<Consignment, _>(store)?;
//! ```
//!
//! Filtering, ordering, counting and slicing are rendered to SQL with
//! [`QueryBuilder::for_search`](keel_data::QueryBuilder::for_search), so only
//! the requested page leaves the database.
//!
//! # Error bridging
//!
//! Due to Rust's orphan rules, `From<sqlx::Error> for DataError` can't be
//! implemented here. Use the [`SqlxErrorExt`] trait instead:
//!
//! ```ignore
//! use keel_data_sqlx::SqlxErrorExt;
//!
//! sqlx::query("DELETE FROM shipments_consignment")
//!     .execute(&pool)
//!     .await
//!     .map_err(|e| e.into_data_error())?;
//! ```

pub mod error;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::{SqlxErrorExt, SqlxResult};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

/// Re-exports of the most commonly used types from both `keel-data` and this crate.
pub mod prelude {
    pub use crate::SqlxErrorExt;
    #[cfg(feature = "sqlite")]
    pub use crate::SqliteStore;
    pub use keel_data::prelude::*;
}
