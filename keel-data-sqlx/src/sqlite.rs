//! SQLite implementation of the record source and sink contracts.
//!
//! Values are stored with SQLite's native affinities; timestamps and
//! identifiers are fixed-width text so that text ordering in SQL matches the
//! ordering used by the in-memory engine.

use std::marker::PhantomData;
use std::sync::Arc;

use keel_data::{
    DataError, Dialect, FieldType, IdentifierPolicy, QueryBuilder, Record, RecordDescriptor,
    RecordId, RecordSink, RecordSource, SearchQuery, Value,
};
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{SqlxErrorExt, SqlxResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9fZ";

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// Record store over one table, named by the record's storage name.
///
/// ```ignore
/// let pool = SqlitePool::connect("sqlite::memory:").await?;
/// let store = SqliteStore::<Consignment>::new(pool)?;
/// store.create_table().await?;
/// let consignments = core.service::<Consignment, _>(store)?;
/// ```
pub struct SqliteStore<R> {
    pool: SqlitePool,
    descriptor: Arc<RecordDescriptor>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for SqliteStore<R> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            descriptor: Arc::clone(&self.descriptor),
            _marker: PhantomData,
        }
    }
}

impl<R: Record> SqliteStore<R> {
    pub fn new(pool: SqlitePool) -> SqlxResult<Self> {
        let descriptor = R::descriptor();
        descriptor.validate()?;
        Ok(Self {
            pool,
            descriptor: Arc::new(descriptor),
            _marker: PhantomData,
        })
    }

    /// Get the underlying pool reference.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn builder(&self) -> QueryBuilder {
        QueryBuilder::new_with_dialect(self.descriptor.storage_name(), Dialect::Sqlite)
            .identifier_policy(IdentifierPolicy::Quote)
    }

    /// `CREATE TABLE IF NOT EXISTS` for the record's storage name.
    pub async fn create_table(&self) -> SqlxResult<()> {
        let columns: Vec<String> = self
            .descriptor
            .fields()
            .iter()
            .map(|field| {
                let affinity = match field.ty {
                    FieldType::Bool | FieldType::Int => "INTEGER",
                    FieldType::Float => "REAL",
                    FieldType::Text | FieldType::Timestamp | FieldType::Id => "TEXT",
                };
                let mut column = format!("\"{}\" {affinity}", field.name);
                if field.name == self.descriptor.id_field() {
                    column.push_str(" PRIMARY KEY");
                }
                if !field.nullable {
                    column.push_str(" NOT NULL");
                }
                column
            })
            .collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.descriptor.storage_name(),
            columns.join(", ")
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        tracing::debug!(table = self.descriptor.storage_name(), "table ensured");
        Ok(())
    }

    fn decode(&self, row: &SqliteRow) -> SqlxResult<R> {
        let mut record = R::default();
        for field in self.descriptor.fields() {
            let value = decode_column(row, field.name, field.ty).map_err(|e| e.into_data_error())?;
            record.set_field(field.name, value)?;
        }
        Ok(record)
    }
}

impl<R: Record> RecordSource<R> for SqliteStore<R> {
    async fn search(&self, query: &SearchQuery) -> Result<(Vec<R>, u64), DataError> {
        let builder = QueryBuilder::for_search(query, Dialect::Sqlite)
            .identifier_policy(IdentifierPolicy::Quote);
        let (select_sql, select_binds) = builder.build_select(query.columns())?;
        let (count_sql, count_binds) = builder.build_count()?;

        // page and total come from the same snapshot
        let mut tx = self.pool.begin().await.map_err(|e| e.into_data_error())?;
        let rows = bind_all(sqlx::query(&select_sql), &select_binds)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| e.into_data_error())?;
        let total: i64 = bind_all(sqlx::query(&count_sql), &count_binds)
            .fetch_one(&mut *tx)
            .await
            .and_then(|row| row.try_get(0))
            .map_err(|e| e.into_data_error())?;
        tx.commit().await.map_err(|e| e.into_data_error())?;

        let records = rows
            .iter()
            .map(|row| self.decode(row))
            .collect::<SqlxResult<Vec<R>>>()?;
        Ok((records, u64::try_from(total).unwrap_or_default()))
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<R>, DataError> {
        let (sql, binds) = self
            .builder()
            .where_eq(self.descriptor.id_field(), *id)
            .build_select(&self.descriptor.field_names())?;
        let row = bind_all(sqlx::query(&sql), &binds)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        row.map(|row| self.decode(&row)).transpose()
    }
}

impl<R: Record> RecordSink<R> for SqliteStore<R> {
    async fn insert(&self, record: &R) -> Result<(), DataError> {
        let columns = self.descriptor.field_names();
        let sql = self.builder().build_insert(&columns)?;
        let binds: Vec<Value> = columns
            .iter()
            .map(|name| record.get_field(name).unwrap_or(Value::Null))
            .collect();
        bind_all(sqlx::query(&sql), &binds)
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        Ok(())
    }

    async fn update(&self, record: &R) -> Result<bool, DataError> {
        let id_field = self.descriptor.id_field();
        let columns: Vec<&str> = self
            .descriptor
            .field_names()
            .into_iter()
            .filter(|name| *name != id_field)
            .collect();
        let sql = self.builder().build_update(&columns, id_field)?;
        let mut binds: Vec<Value> = columns
            .iter()
            .map(|name| record.get_field(name).unwrap_or(Value::Null))
            .collect();
        binds.push(Value::Id(record.id()));
        let result = bind_all(sqlx::query(&sql), &binds)
            .execute(&self.pool)
            .await
            .map_err(|e| e.into_data_error())?;
        Ok(result.rows_affected() > 0)
    }
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, values: &[Value]) -> SqliteQuery<'q> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::Text(s) => query.bind(s.clone()),
            Value::Timestamp(t) => query.bind(t.format(TIMESTAMP_FORMAT).to_string()),
            Value::Id(id) => query.bind(id.to_string()),
        };
    }
    query
}

fn decode_column(row: &SqliteRow, name: &str, ty: FieldType) -> Result<Value, sqlx::Error> {
    let value = match ty {
        FieldType::Bool => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldType::Int => row.try_get::<Option<i64>, _>(name)?.map(Value::Int),
        FieldType::Float => row.try_get::<Option<f64>, _>(name)?.map(Value::Float),
        FieldType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::Text),
        FieldType::Timestamp | FieldType::Id => match row.try_get::<Option<String>, _>(name)? {
            Some(raw) => Some(
                Value::parse(ty, &raw).map_err(|e| sqlx::Error::ColumnDecode {
                    index: name.to_string(),
                    source: Box::new(e),
                })?,
            ),
            None => None,
        },
    };
    Ok(value.unwrap_or(Value::Null))
}
