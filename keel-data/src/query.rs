use crate::engine::SearchQuery;
use crate::error::DataError;
use crate::filter::{FilterOp, Predicate};
use crate::sort::Direction;
use crate::value::Value;

/// A fluent builder for parameterised SELECT, COUNT, INSERT and UPDATE
/// statements with typed bind values.
///
/// # Example
///
/// ```ignore
/// let q = QueryBuilder::new("shipments_consignment")
///     .where_eq("status", "closed")
///     .where_contains("reference", "ab_")
///     .order_by("created_at", Direction::Descending)
///     .limit(10);
/// let (sql, binds) = q.build_select(&["id", "status"])?;
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// Generic SQL using `?` placeholders (default).
    #[default]
    Generic,
    /// SQLite-style `?` placeholders.
    Sqlite,
    /// MySQL-style `?` placeholders with backtick quoting.
    MySql,
    /// Postgres-style `$1, $2, ...` placeholders.
    Postgres,
}

impl Dialect {
    fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Generic | Dialect::Sqlite | Dialect::MySql => "?".to_string(),
        }
    }

    fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Generic | Dialect::Sqlite | Dialect::Postgres => '"',
        }
    }

    /// MySQL already puts nulls first ascending and last descending, and has
    /// no `NULLS FIRST` syntax.
    fn explicit_null_order(self) -> bool {
        !matches!(self, Dialect::MySql)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Validate identifiers against a conservative pattern.
    #[default]
    Validate,
    /// Validate and quote identifiers using the dialect quoting style.
    Quote,
}

/// Escape character used in every rendered `LIKE`.
const LIKE_ESCAPE: char = '!';

/// Largest `LIMIT`/`OFFSET` rendered; SQL engines take these as signed 64-bit.
const MAX_ROW_COUNT: u64 = i64::MAX as u64;

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    table: String,
    conditions: Vec<Condition>,
    order: Vec<(String, Direction)>,
    limit_val: Option<u64>,
    offset_val: Option<u64>,
    dialect: Dialect,
    identifier_policy: IdentifierPolicy,
}

#[derive(Debug, Clone)]
enum Condition {
    Compare(String, &'static str, Value),
    Like(String, String),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
}

impl QueryBuilder {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit_val: None,
            offset_val: None,
            dialect: Dialect::Generic,
            identifier_policy: IdentifierPolicy::Validate,
        }
    }

    /// Create a new builder with an explicit SQL dialect.
    pub fn new_with_dialect(table: &str, dialect: Dialect) -> Self {
        Self::new(table).dialect(dialect)
    }

    /// Render a prepared search: its predicates, its full sort order and its
    /// page window, against the record's storage name.
    pub fn for_search(query: &SearchQuery, dialect: Dialect) -> Self {
        let mut builder = Self::new_with_dialect(query.storage_name(), dialect);
        for predicate in query.filters() {
            builder = builder.predicate(predicate);
        }
        for (field, direction) in query.order().keys() {
            builder = builder.order_by(field.name, *direction);
        }
        builder
            .limit(query.window().size())
            .offset(query.window().offset())
    }

    /// Set the SQL dialect (affects placeholder style, quoting and null ordering).
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    fn compare(mut self, column: &str, op: &'static str, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Compare(column.to_string(), op, value.into()));
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, "=", value)
    }

    pub fn where_not_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, "<>", value)
    }

    pub fn where_gt(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, ">", value)
    }

    pub fn where_gte(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, ">=", value)
    }

    pub fn where_lt(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, "<", value)
    }

    pub fn where_lte(self, column: &str, value: impl Into<Value>) -> Self {
        self.compare(column, "<=", value)
    }

    fn like(mut self, column: &str, pattern: String) -> Self {
        self.conditions
            .push(Condition::Like(column.to_string(), pattern));
        self
    }

    /// Substring match folding ASCII case; `%` and `_` in `needle` are literal.
    pub fn where_contains(self, column: &str, needle: &str) -> Self {
        let pattern = format!("%{}%", escape_like(needle));
        self.like(column, pattern)
    }

    pub fn where_starts_with(self, column: &str, prefix: &str) -> Self {
        let pattern = format!("{}%", escape_like(prefix));
        self.like(column, pattern)
    }

    pub fn where_ends_with(self, column: &str, suffix: &str) -> Self {
        let pattern = format!("%{}", escape_like(suffix));
        self.like(column, pattern)
    }

    pub fn where_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.conditions
            .push(Condition::In(column.to_string(), values));
        self
    }

    pub fn where_null(mut self, column: &str) -> Self {
        self.conditions.push(Condition::IsNull(column.to_string()));
        self
    }

    pub fn where_not_null(mut self, column: &str) -> Self {
        self.conditions
            .push(Condition::IsNotNull(column.to_string()));
        self
    }

    fn predicate(self, predicate: &Predicate) -> Self {
        let column = predicate.field().name;
        let operand = predicate.values().first().cloned().unwrap_or(Value::Null);
        let text = match &operand {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        };
        match predicate.op() {
            FilterOp::Equals => self.where_eq(column, operand),
            FilterOp::NotEquals => self.where_not_eq(column, operand),
            FilterOp::GreaterThan => self.where_gt(column, operand),
            FilterOp::GreaterOrEqual => self.where_gte(column, operand),
            FilterOp::LessThan => self.where_lt(column, operand),
            FilterOp::LessOrEqual => self.where_lte(column, operand),
            FilterOp::Contains => self.where_contains(column, &text),
            FilterOp::StartsWith => self.where_starts_with(column, &text),
            FilterOp::EndsWith => self.where_ends_with(column, &text),
            FilterOp::In => self.where_in(column, predicate.values().to_vec()),
            FilterOp::IsNull => self.where_null(column),
            FilterOp::IsNotNull => self.where_not_null(column),
        }
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push((column.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit_val = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset_val = Some(offset);
        self
    }

    /// Build a SELECT query returning `(sql, bind_values)`.
    pub fn build_select(&self, columns: &[&str]) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let columns = self.format_column_list(columns)?;

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
        self.append_order(&mut sql)?;
        self.append_limit_offset(&mut sql);
        Ok((sql, params))
    }

    /// Build a COUNT query over the same conditions, ignoring order and window.
    pub fn build_count(&self) -> Result<(String, Vec<Value>), QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let mut params = Vec::new();
        let mut placeholder_idx = 1usize;
        self.append_where(&mut sql, &mut params, &mut placeholder_idx)?;
        Ok((sql, params))
    }

    /// `INSERT INTO table (a, b) VALUES (?, ?)`; bind in column order.
    pub fn build_insert(&self, columns: &[&str]) -> Result<String, QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let names = self.format_column_list(columns)?;
        let placeholders: Vec<_> = (1..=columns.len())
            .map(|i| self.dialect.placeholder(i))
            .collect();
        Ok(format!(
            "INSERT INTO {table} ({names}) VALUES ({})",
            placeholders.join(", ")
        ))
    }

    /// `UPDATE table SET a = ?, b = ? WHERE key = ?`; bind the columns in
    /// order, then the key.
    pub fn build_update(&self, columns: &[&str], key: &str) -> Result<String, QueryError> {
        let table = self.format_identifier(&self.table, false, "table")?;
        let mut assignments = Vec::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            let col = self.format_identifier(col, false, "column")?;
            assignments.push(format!("{col} = {}", self.dialect.placeholder(i + 1)));
        }
        let key = self.format_identifier(key, false, "column")?;
        Ok(format!(
            "UPDATE {table} SET {} WHERE {key} = {}",
            assignments.join(", "),
            self.dialect.placeholder(columns.len() + 1)
        ))
    }

    fn append_where(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        placeholder_idx: &mut usize,
    ) -> Result<(), QueryError> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        sql.push_str(" WHERE ");
        let mut first = true;
        for cond in &self.conditions {
            if !first {
                sql.push_str(" AND ");
            }
            first = false;
            match cond {
                Condition::Compare(col, op, val) => {
                    let col = self.format_identifier(col, false, "column")?;
                    let placeholder = self.dialect.placeholder(*placeholder_idx);
                    *placeholder_idx += 1;
                    sql.push_str(&format!("{col} {op} {placeholder}"));
                    params.push(val.clone());
                }
                Condition::Like(col, pat) => {
                    let col = self.format_identifier(col, false, "column")?;
                    let placeholder = self.dialect.placeholder(*placeholder_idx);
                    *placeholder_idx += 1;
                    sql.push_str(&format!(
                        "LOWER({col}) LIKE {placeholder} ESCAPE '{LIKE_ESCAPE}'"
                    ));
                    params.push(Value::Text(pat.to_ascii_lowercase()));
                }
                Condition::In(col, vals) => {
                    let col = self.format_identifier(col, false, "column")?;
                    let placeholders: Vec<_> = vals
                        .iter()
                        .map(|_| {
                            let placeholder = self.dialect.placeholder(*placeholder_idx);
                            *placeholder_idx += 1;
                            placeholder
                        })
                        .collect();
                    sql.push_str(&format!("{col} IN ({})", placeholders.join(", ")));
                    params.extend(vals.iter().cloned());
                }
                Condition::IsNull(col) => {
                    let col = self.format_identifier(col, false, "column")?;
                    sql.push_str(&format!("{col} IS NULL"));
                }
                Condition::IsNotNull(col) => {
                    let col = self.format_identifier(col, false, "column")?;
                    sql.push_str(&format!("{col} IS NOT NULL"));
                }
            }
        }
        Ok(())
    }

    fn append_order(&self, sql: &mut String) -> Result<(), QueryError> {
        if self.order.is_empty() {
            return Ok(());
        }
        sql.push_str(" ORDER BY ");
        let mut clauses = Vec::with_capacity(self.order.len());
        for (col, direction) in &self.order {
            let col = self.format_identifier(col, false, "column")?;
            let (dir, nulls) = match direction {
                Direction::Ascending => ("ASC", "NULLS FIRST"),
                Direction::Descending => ("DESC", "NULLS LAST"),
            };
            if self.dialect.explicit_null_order() {
                clauses.push(format!("{col} {dir} {nulls}"));
            } else {
                clauses.push(format!("{col} {dir}"));
            }
        }
        sql.push_str(&clauses.join(", "));
        Ok(())
    }

    fn append_limit_offset(&self, sql: &mut String) {
        // engines read anything above i64::MAX as a float and reject it
        if let Some(limit) = self.limit_val {
            sql.push_str(&format!(" LIMIT {}", limit.min(MAX_ROW_COUNT)));
        }
        if let Some(offset) = self.offset_val {
            sql.push_str(&format!(" OFFSET {}", offset.min(MAX_ROW_COUNT)));
        }
    }

    fn format_column_list(&self, columns: &[&str]) -> Result<String, QueryError> {
        let mut out = Vec::with_capacity(columns.len());
        for col in columns {
            out.push(self.format_identifier(col, true, "column")?);
        }
        Ok(out.join(", "))
    }

    fn format_identifier(
        &self,
        ident: &str,
        allow_star: bool,
        kind: &'static str,
    ) -> Result<String, QueryError> {
        if !is_valid_identifier(ident, allow_star) {
            return Err(QueryError::InvalidIdentifier {
                kind,
                ident: ident.to_string(),
            });
        }
        match self.identifier_policy {
            IdentifierPolicy::Quote => Ok(quote_identifier(ident, self.dialect, allow_star)),
            IdentifierPolicy::Validate => Ok(ident.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum QueryError {
    InvalidIdentifier { kind: &'static str, ident: String },
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::InvalidIdentifier { kind, ident } => {
                write!(f, "Invalid {kind} identifier: {ident}")
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// Identifiers come from record descriptors, so a bad one is a setup fault.
impl From<QueryError> for DataError {
    fn from(err: QueryError) -> Self {
        DataError::Configuration(err.to_string())
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' || c == LIKE_ESCAPE {
            out.push(LIKE_ESCAPE);
        }
        out.push(c);
    }
    out
}

fn is_valid_identifier(ident: &str, allow_star: bool) -> bool {
    if ident.is_empty() {
        return false;
    }
    let parts: Vec<&str> = ident.split('.').collect();
    for (idx, part) in parts.iter().enumerate() {
        if allow_star && *part == "*" {
            return idx + 1 == parts.len();
        }
        if !is_valid_segment(part) {
            return false;
        }
    }
    true
}

fn is_valid_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(ident: &str, dialect: Dialect, allow_star: bool) -> String {
    let quote = dialect.quote_char();
    let parts: Vec<&str> = ident.split('.').collect();
    let last_idx = parts.len().saturating_sub(1);
    parts
        .into_iter()
        .enumerate()
        .map(|(idx, part)| {
            if allow_star && part == "*" && idx == last_idx {
                part.to_string()
            } else {
                format!("{quote}{part}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::catalog::{Catalog, RecordDescriptor};
    use crate::engine::QueryEngine;
    use crate::filter::FilterSpec;
    use crate::page::PageRequest;
    use crate::sort::SortSpec;
    use crate::value::FieldType;

    #[test]
    fn test_simple_select() {
        let (sql, params) = QueryBuilder::new("parcels").build_select(&["*"]).unwrap();
        assert_eq!(sql, "SELECT * FROM parcels");
        assert!(params.is_empty());
    }

    #[test]
    fn test_typed_binds_and_order() {
        let (sql, params) = QueryBuilder::new("parcels")
            .where_eq("status", "closed")
            .where_gt("weight", 10i64)
            .order_by("weight", Direction::Descending)
            .limit(10)
            .offset(20)
            .build_select(&["id", "weight"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id, weight FROM parcels WHERE status = ? AND weight > ? \
             ORDER BY weight DESC NULLS LAST LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, vec![Value::text("closed"), Value::Int(10)]);
    }

    #[test]
    fn test_window_is_clamped_to_signed_range() {
        let (sql, _) = QueryBuilder::new("parcels")
            .limit(10)
            .offset(u64::MAX)
            .build_select(&["id"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT id FROM parcels LIMIT 10 OFFSET 9223372036854775807"
        );
    }

    #[test]
    fn test_like_is_escaped_and_lowercased() {
        let (sql, params) = QueryBuilder::new("parcels")
            .where_contains("reference", "AB_1%")
            .build_select(&["*"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM parcels WHERE LOWER(reference) LIKE ? ESCAPE '!'"
        );
        assert_eq!(params, vec![Value::text("%ab!_1!%%")]);
    }

    #[test]
    fn test_postgres_placeholders_and_quoting() {
        let (sql, params) = QueryBuilder::new_with_dialect("parcels", Dialect::Postgres)
            .identifier_policy(IdentifierPolicy::Quote)
            .where_eq("status", "open")
            .where_in("carrier", vec![Value::text("dhl"), Value::text("ups")])
            .order_by("id", Direction::Ascending)
            .build_select(&["id"])
            .unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\" FROM \"parcels\" WHERE \"status\" = $1 AND \"carrier\" IN ($2, $3) \
             ORDER BY \"id\" ASC NULLS FIRST"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_mysql_relies_on_default_null_order() {
        let (sql, _) = QueryBuilder::new_with_dialect("parcels", Dialect::MySql)
            .identifier_policy(IdentifierPolicy::Quote)
            .order_by("weight", Direction::Ascending)
            .build_select(&["*"])
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `parcels` ORDER BY `weight` ASC");
    }

    #[test]
    fn test_count_ignores_window() {
        let (sql, params) = QueryBuilder::new("parcels")
            .where_null("notes")
            .order_by("id", Direction::Ascending)
            .limit(5)
            .build_count()
            .unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM parcels WHERE notes IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn test_insert_and_update() {
        let builder = QueryBuilder::new_with_dialect("parcels", Dialect::Postgres);
        assert_eq!(
            builder.build_insert(&["id", "status"]).unwrap(),
            "INSERT INTO parcels (id, status) VALUES ($1, $2)"
        );
        assert_eq!(
            builder.build_update(&["status", "weight"], "id").unwrap(),
            "UPDATE parcels SET status = $1, weight = $2 WHERE id = $3"
        );
    }

    #[test]
    fn test_invalid_identifier() {
        let err = QueryBuilder::new("parcels;drop")
            .build_select(&["*"])
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier { .. }));
        assert!(DataError::from(err).is_configuration());
    }

    #[test]
    fn test_renders_prepared_search() {
        let mut catalog = Catalog::new();
        catalog
            .register(
                RecordDescriptor::builder("parcel", "shipments_parcel")
                    .id("id")
                    .field("status", FieldType::Text)
                    .optional("weight", FieldType::Int)
                    .build(),
            )
            .unwrap();
        let engine = QueryEngine::new(Arc::new(catalog), 100);
        let query = engine
            .prepare(
                "parcel",
                &FilterSpec::parse("status:starts_with:Cl;weight:in:1,2").unwrap(),
                &SortSpec::parse("-weight").unwrap(),
                &PageRequest::new(3, 10),
            )
            .unwrap();

        let builder = QueryBuilder::for_search(&query, Dialect::Sqlite);
        let (sql, params) = builder.build_select(query.columns()).unwrap();
        assert_eq!(
            sql,
            "SELECT id, status, weight FROM shipments_parcel \
             WHERE LOWER(status) LIKE ? ESCAPE '!' AND weight IN (?, ?) \
             ORDER BY weight DESC NULLS LAST, id ASC NULLS FIRST LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            params,
            vec![Value::text("cl%"), Value::Int(1), Value::Int(2)]
        );
    }
}
