//! Audit-field stamping for create and update.
//!
//! The [`AuditInterceptor`] is the only writer of `created_at`, `created_by`,
//! `modified_at` and `modified_by`. Whatever upstream code put into those
//! fields is overwritten, never merged.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::catalog::{Catalog, CREATED_AT, CREATED_BY, MODIFIED_AT, MODIFIED_BY};
use crate::entity::Record;
use crate::error::DataError;
use crate::value::Value;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Acting identity and time source for one unit of work.
///
/// Built at the start of a request and dropped at its end; the core only
/// ever reads it.
#[derive(Clone)]
pub struct AuditContext {
    actor: Option<String>,
    clock: Arc<dyn Clock>,
}

impl AuditContext {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            actor: Some(actor.into()),
            clock: Arc::new(SystemClock),
        }
    }

    /// A context with no acting identity, e.g. a scheduled job.
    pub fn anonymous() -> Self {
        Self {
            actor: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The acting identity; a blank identity counts as none.
    pub fn actor(&self) -> Option<&str> {
        self.actor
            .as_deref()
            .filter(|actor| !actor.trim().is_empty())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl fmt::Debug for AuditContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditContext")
            .field("actor", &self.actor)
            .finish_non_exhaustive()
    }
}

/// Stamps audit fields on records whose catalog entry is auditable.
#[derive(Debug, Clone)]
pub struct AuditInterceptor {
    catalog: Arc<Catalog>,
    system_identity: String,
}

impl AuditInterceptor {
    pub fn new(catalog: Arc<Catalog>, system_identity: impl Into<String>) -> Self {
        Self {
            catalog,
            system_identity: system_identity.into(),
        }
    }

    pub fn system_identity(&self) -> &str {
        &self.system_identity
    }

    fn actor(&self, ctx: &AuditContext) -> Value {
        Value::text(ctx.actor().unwrap_or(&self.system_identity))
    }

    fn is_auditable<R: Record>(&self) -> Result<bool, DataError> {
        Ok(self.catalog.descriptor(R::type_name())?.is_auditable())
    }

    /// Create transition: set creation metadata, clear modification metadata.
    pub fn stamp_create<R: Record>(
        &self,
        ctx: &AuditContext,
        record: &mut R,
    ) -> Result<(), DataError> {
        if !self.is_auditable::<R>()? {
            return Ok(());
        }
        record.set_field(CREATED_AT, Value::Timestamp(ctx.now()))?;
        record.set_field(CREATED_BY, self.actor(ctx))?;
        record.set_field(MODIFIED_AT, Value::Null)?;
        record.set_field(MODIFIED_BY, Value::Null)?;
        Ok(())
    }

    /// Update transition: set modification metadata and restore creation
    /// metadata from the stored record.
    pub fn stamp_update<R: Record>(
        &self,
        ctx: &AuditContext,
        record: &mut R,
        previous: &R,
    ) -> Result<(), DataError> {
        if !self.is_auditable::<R>()? {
            return Ok(());
        }
        for field in [CREATED_AT, CREATED_BY] {
            let original = previous.get_field(field).unwrap_or(Value::Null);
            record.set_field(field, original)?;
        }
        record.set_field(MODIFIED_AT, Value::Timestamp(ctx.now()))?;
        record.set_field(MODIFIED_BY, self.actor(ctx))?;
        Ok(())
    }
}
