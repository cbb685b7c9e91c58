//! Payload schema for Qdrant points

use crate::models::DocumentRecord;
use chrono::{DateTime, Utc};
use qdrant_client::qdrant::{PointStruct, Value as QdrantValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Payload stored with each document point in Qdrant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPayload {
    /// Caller-visible document id, stable per tenant
    pub doc_id: String,

    /// Passage text
    pub text: String,

    /// Tenant scope, matched by every query filter
    pub tenant_id: String,

    /// Owner scope, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    /// Free-form labels
    #[serde(default)]
    pub tags: Vec<String>,

    /// RFC 3339 ingestion timestamp
    pub created_at: String,
}

impl DocumentPayload {
    pub fn from_record(record: &DocumentRecord) -> Self {
        Self {
            doc_id: record.id.clone(),
            text: record.text.clone(),
            tenant_id: record.tenant_id.clone(),
            owner_id: record.owner_id.clone(),
            tags: record.tags.clone(),
            created_at: record.created_at.to_rfc3339(),
        }
    }

    /// Parse the stored timestamp; epoch on malformed data so ordering
    /// stays total
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Convert to Qdrant payload format
    pub fn to_qdrant_payload(&self) -> HashMap<String, QdrantValue> {
        let mut map = HashMap::new();

        map.insert("doc_id".to_string(), string_to_qdrant(&self.doc_id));
        map.insert("text".to_string(), string_to_qdrant(&self.text));
        map.insert("tenant_id".to_string(), string_to_qdrant(&self.tenant_id));
        map.insert("created_at".to_string(), string_to_qdrant(&self.created_at));

        if let Some(ref owner_id) = self.owner_id {
            map.insert("owner_id".to_string(), string_to_qdrant(owner_id));
        }

        if !self.tags.is_empty() {
            let values: Vec<QdrantValue> = self.tags.iter().map(|s| string_to_qdrant(s)).collect();
            map.insert(
                "tags".to_string(),
                QdrantValue {
                    kind: Some(qdrant_client::qdrant::value::Kind::ListValue(
                        qdrant_client::qdrant::ListValue { values },
                    )),
                },
            );
        }

        map
    }
}

/// Stable point id derived from tenant and document id; re-indexing the
/// same pair replaces the point instead of duplicating it
pub fn point_uuid(tenant_id: &str, doc_id: &str) -> Uuid {
    let name = format!("{}/{}", tenant_id, doc_id);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Build a PointStruct for a document record
pub fn record_to_point(record: &DocumentRecord) -> PointStruct {
    let id = point_uuid(&record.tenant_id, &record.id);
    let payload = DocumentPayload::from_record(record).to_qdrant_payload();
    PointStruct::new(id.to_string(), record.embedding.clone(), payload)
}

fn string_to_qdrant(s: &str) -> QdrantValue {
    QdrantValue {
        kind: Some(qdrant_client::qdrant::value::Kind::StringValue(
            s.to_string(),
        )),
    }
}

/// Convert Qdrant value to serde_json Value
pub fn json_from_qdrant_value(v: qdrant_client::qdrant::Value) -> Value {
    use qdrant_client::qdrant::value::Kind;

    match v.kind {
        Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::Number(i.into()),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(
            list.values
                .into_iter()
                .map(json_from_qdrant_value)
                .collect(),
        ),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, json_from_qdrant_value(v)))
                .collect(),
        ),
        None => Value::Null,
    }
}

impl TryFrom<Map<String, Value>> for DocumentPayload {
    type Error = crate::error::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        serde_json::from_value(Value::Object(map))
            .map_err(|e| crate::error::Error::Search(format!("malformed point payload: {}", e)))
    }
}
