#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keel_data::catalog::FieldDescriptor;
use keel_data::prelude::*;
use keel_data::{impl_field_access, AuditContext, FixedClock};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Consignment {
    pub id: RecordId,
    pub reference: String,
    pub status: String,
    pub weight_kg: i64,
    pub carrier: Option<String>,
    pub fragile: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
}

impl_field_access!(Consignment {
    id,
    reference,
    status,
    weight_kg,
    carrier,
    fragile,
    created_at,
    created_by,
    modified_at,
    modified_by,
});

impl Record for Consignment {
    fn type_name() -> &'static str {
        "consignment"
    }

    fn descriptor() -> RecordDescriptor {
        RecordDescriptor::builder("consignment", "shipments_consignment")
            .id("id")
            .field("reference", FieldType::Text)
            .field("status", FieldType::Text)
            .field("weight_kg", FieldType::Int)
            .optional("carrier", FieldType::Text)
            .field("fragile", FieldType::Bool)
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

impl Projected for Consignment {
    type Reduced = ConsignmentSummary;
    type Detailed = ConsignmentDetail;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsignmentSummary {
    pub id: RecordId,
    pub reference: String,
    pub status: String,
    pub label: String,
}

impl_field_access!(ConsignmentSummary { id, reference, status, label });

impl Shape for ConsignmentSummary {
    fn shape_name() -> &'static str {
        "consignment_summary"
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Id),
            FieldDescriptor::new("reference", FieldType::Text),
            FieldDescriptor::new("status", FieldType::Text),
            FieldDescriptor::new("label", FieldType::Text),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsignmentDetail {
    pub id: RecordId,
    pub reference: String,
    pub status: String,
    pub weight_kg: i64,
    pub carrier: Option<String>,
    pub fragile: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub modified_at: Option<DateTime<Utc>>,
    pub modified_by: Option<String>,
}

impl_field_access!(ConsignmentDetail {
    id,
    reference,
    status,
    weight_kg,
    carrier,
    fragile,
    created_at,
    created_by,
    modified_at,
    modified_by,
});

impl Shape for ConsignmentDetail {
    fn shape_name() -> &'static str {
        "consignment_detail"
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::new("id", FieldType::Id),
            FieldDescriptor::new("reference", FieldType::Text),
            FieldDescriptor::new("status", FieldType::Text),
            FieldDescriptor::new("weight_kg", FieldType::Int),
            FieldDescriptor::optional("carrier", FieldType::Text),
            FieldDescriptor::new("fragile", FieldType::Bool),
            FieldDescriptor::optional("created_at", FieldType::Timestamp),
            FieldDescriptor::optional("created_by", FieldType::Text),
            FieldDescriptor::optional("modified_at", FieldType::Timestamp),
            FieldDescriptor::optional("modified_by", FieldType::Text),
        ]
    }
}

pub fn summary_rule() -> MappingRule<Consignment, ConsignmentSummary> {
    MappingRule::new()
        .computed("label", |c: &Consignment| {
            Value::text(format!("{} ({})", c.reference, c.status))
        })
        .copy_matching()
}

pub fn detail_rule() -> MappingRule<Consignment, ConsignmentDetail> {
    MappingRule::new().copy_matching()
}

pub fn core() -> DataCore {
    DataCore::builder()
        .record::<Consignment>()
        .mapping(summary_rule())
        .mapping(detail_rule())
        .build()
        .expect("consignment core should build")
}

pub type Consignments = DataService<Consignment, InMemoryStore<Consignment>>;

pub fn service() -> Consignments {
    core()
        .service(InMemoryStore::new())
        .expect("both canonical mappings are registered")
}

pub fn detail(reference: &str, status: &str, weight_kg: i64) -> ConsignmentDetail {
    ConsignmentDetail {
        reference: reference.into(),
        status: status.into(),
        weight_kg,
        ..Default::default()
    }
}

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
}

pub fn ctx(actor: &str, hour: u32) -> AuditContext {
    AuditContext::new(actor).with_clock(FixedClock(at(hour)))
}
