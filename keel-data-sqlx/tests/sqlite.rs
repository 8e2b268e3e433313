#![cfg(feature = "sqlite")]

use chrono::{TimeZone, Timelike, Utc};
use keel_data::catalog::FieldDescriptor;
use keel_data::{impl_field_access, AuditContext, FixedClock};
use keel_data_sqlx::prelude::*;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

#[derive(Debug, Clone, Default, PartialEq)]
struct Parcel {
    id: RecordId,
    code: String,
    weight: Option<i64>,
    express: bool,
    created_at: Option<chrono::DateTime<Utc>>,
    created_by: Option<String>,
    modified_at: Option<chrono::DateTime<Utc>>,
    modified_by: Option<String>,
}

impl_field_access!(Parcel {
    id,
    code,
    weight,
    express,
    created_at,
    created_by,
    modified_at,
    modified_by,
});

impl Record for Parcel {
    fn type_name() -> &'static str {
        "parcel"
    }

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::builder("parcel", "shipments_parcel")
            .id("id")
            .field("code", FieldType::Text)
            .optional("weight", FieldType::Int)
            .field("express", FieldType::Bool)
            .auditable()
            .build()
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ParcelView {
    id: RecordId,
    code: String,
    weight: Option<i64>,
    express: bool,
    created_at: Option<chrono::DateTime<Utc>>,
    created_by: Option<String>,
}

impl_field_access!(ParcelView { id, code, weight, express, created_at, created_by });

impl Shape for ParcelView {
    fn shape_name() -> &'static str {
        "parcel_view"
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Id),
            FieldDescriptor::new("code", FieldType::Text),
            FieldDescriptor::optional("weight", FieldType::Int),
            FieldDescriptor::new("express", FieldType::Bool),
            FieldDescriptor::optional("created_at", FieldType::Timestamp),
            FieldDescriptor::optional("created_by", FieldType::Text),
        ]
    }
}

impl Projected for Parcel {
    type Reduced = ParcelView;
    type Detailed = ParcelView;
}

async fn pool() -> SqlitePool {
    // one connection, so every query sees the same in-memory database
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

async fn services() -> (
    DataService<Parcel, SqliteStore<Parcel>>,
    DataService<Parcel, InMemoryStore<Parcel>>,
) {
    let core = DataCore::builder()
        .record::<Parcel>()
        .mapping(MappingRule::<Parcel, ParcelView>::new().copy_matching())
        .build()
        .unwrap();
    let store = SqliteStore::<Parcel>::new(pool().await).unwrap();
    store.create_table().await.unwrap();
    (
        core.service(store).unwrap(),
        core.service(InMemoryStore::new()).unwrap(),
    )
}

fn ctx() -> AuditContext {
    AuditContext::new("alice").with_clock(FixedClock(
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
    ))
}

fn view(code: &str, weight: Option<i64>, express: bool) -> ParcelView {
    ParcelView {
        code: code.into(),
        weight,
        express,
        ..Default::default()
    }
}

#[tokio::test]
async fn create_then_find_round_trips_every_type() {
    let (sql, _) = services().await;
    let id = sql.create(&ctx(), &view("P-1", Some(7), true)).await.unwrap();

    let found = sql.find(&id).await.unwrap();
    assert_eq!(found.id, id);
    assert_eq!(found.code, "P-1");
    assert_eq!(found.weight, Some(7));
    assert!(found.express);
    assert_eq!(found.created_by.as_deref(), Some("alice"));
    assert_eq!(
        found.created_at,
        Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn sql_search_matches_in_memory_search() {
    let (sql, memory) = services().await;
    let seeds = [
        ("A-1", Some(3), false),
        ("a-2", None, true),
        ("B_3", Some(12), true),
        ("B-4", Some(12), false),
        ("C-5", None, false),
        ("c%6", Some(1), true),
        ("CAFÉ-7", Some(2), false),
    ];
    for (code, weight, express) in seeds {
        let shape = view(code, weight, express);
        let id = sql.create(&ctx(), &shape).await.unwrap();
        // same identifier in both stores so the tie-break agrees
        let record = Parcel {
            id,
            code: shape.code,
            weight: shape.weight,
            express: shape.express,
            ..Default::default()
        };
        memory.store().insert(&record).await.unwrap();
    }

    let cases = [
        ("", "weight"),
        ("", "-weight,code"),
        ("code:starts_with:b_", "code"),
        ("code:contains:%", ""),
        ("express:eq:true", "-code"),
        ("weight:is_null", ""),
        ("weight:in:1,12;express:ne:true", "weight"),
        ("code:contains:café", ""),
        ("code:starts_with:cafÉ", "code"),
    ];
    for (filter, sort) in cases {
        for page in 1..=3 {
            let filter = FilterSpec::parse(filter).unwrap();
            let sort = SortSpec::parse(sort).unwrap();
            let request = PageRequest::new(page, 2);
            let from_sql = sql.search(&filter, &sort, &request).await.unwrap();
            let from_memory = memory.search(&filter, &sort, &request).await.unwrap();

            let sql_ids: Vec<RecordId> = from_sql.items.iter().map(|v| v.id).collect();
            let memory_ids: Vec<RecordId> = from_memory.items.iter().map(|v| v.id).collect();
            assert_eq!(sql_ids, memory_ids, "filter {filter:?} sort {sort:?} page {page}");
            assert_eq!(from_sql.total_count, from_memory.total_count);
        }
    }
}

#[tokio::test]
async fn page_far_past_the_end_is_empty_with_total() {
    let (sql, memory) = services().await;
    let id = sql.create(&ctx(), &view("P-1", Some(5), false)).await.unwrap();
    memory
        .store()
        .insert(&Parcel {
            id,
            code: "P-1".into(),
            ..Default::default()
        })
        .await
        .unwrap();

    let request = PageRequest::new(u64::MAX / 2, 10);
    for page in [
        sql.search(&FilterSpec::new(), &SortSpec::new(), &request).await.unwrap(),
        memory.search(&FilterSpec::new(), &SortSpec::new(), &request).await.unwrap(),
    ] {
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 1);
    }
}

#[tokio::test]
async fn timestamps_keep_nanoseconds() {
    let store = SqliteStore::<Parcel>::new(pool().await).unwrap();
    store.create_table().await.unwrap();
    let stamped = Utc
        .with_ymd_and_hms(2024, 3, 1, 9, 30, 0)
        .unwrap()
        .with_nanosecond(123_456_789)
        .unwrap();
    let record = Parcel {
        id: RecordId::generate(),
        code: "P-1".into(),
        created_at: Some(stamped),
        ..Default::default()
    };
    store.insert(&record).await.unwrap();

    let found = store.find_by_id(&record.id).await.unwrap().unwrap();
    assert_eq!(found.created_at, Some(stamped));
    assert_eq!(found, record);
}

#[tokio::test]
async fn nulls_sort_first_ascending() {
    let (sql, _) = services().await;
    sql.create(&ctx(), &view("P-1", Some(5), false)).await.unwrap();
    sql.create(&ctx(), &view("P-2", None, false)).await.unwrap();

    let page = sql
        .search(
            &FilterSpec::new(),
            &SortSpec::parse("weight").unwrap(),
            &PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.items[0].weight, None);
    assert_eq!(page.items[1].weight, Some(5));
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let (sql, _) = services().await;
    let err = sql
        .update(&ctx(), &RecordId::generate(), &view("P-9", None, false))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn update_writes_the_whole_row() {
    let (sql, _) = services().await;
    let id = sql.create(&ctx(), &view("P-1", Some(5), false)).await.unwrap();

    sql.update(&ctx(), &id, &view("P-1b", None, true))
        .await
        .unwrap();

    let found = sql.find(&id).await.unwrap();
    assert_eq!(found.code, "P-1b");
    assert_eq!(found.weight, None);
    assert!(found.express);
    assert_eq!(found.created_by.as_deref(), Some("alice"));
}

#[tokio::test]
async fn duplicate_insert_is_a_store_error() {
    let store = SqliteStore::<Parcel>::new(pool().await).unwrap();
    store.create_table().await.unwrap();
    let record = Parcel {
        id: RecordId::generate(),
        code: "P-1".into(),
        ..Default::default()
    };
    store.insert(&record).await.unwrap();
    let err = store.insert(&record).await.unwrap_err();
    assert!(matches!(err, DataError::Store(_)));
}
