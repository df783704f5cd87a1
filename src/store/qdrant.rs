//! Qdrant-backed [`VectorStore`].
//!
//! All mutating calls set `wait(true)` so Qdrant acknowledges only after the
//! write has been applied.

use std::time::Duration;

use async_trait::async_trait;
use qdrant_client::qdrant::{
    point_id::PointIdOptions, value::Kind, Condition, CreateCollectionBuilder,
    CreateFieldIndexCollectionBuilder, DeletePointsBuilder, Distance as QdrantDistance, FieldType,
    Filter, PointId, PointStruct, PointVectors, PointsIdsList, SearchPointsBuilder,
    SetPayloadPointsBuilder, UpdatePointVectorsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant, QdrantError};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Distance, FieldFilter, Point, ScoredPoint, SearchRequest, StoreError, VectorStore};
use crate::config::StoreConfig;

pub struct QdrantStore {
    client: Qdrant,
}

impl QdrantStore {
    /// Build a client for `config.url`. No network traffic happens until the first call.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        debug!(url = %config.url, "connecting to Qdrant");
        let client = Qdrant::from_url(&config.url)
            .api_key(config.api_key.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(classify)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn list_collections(&self) -> Result<Vec<String>, StoreError> {
        let response = self.client.list_collections().await.map_err(classify)?;
        Ok(response.collections.into_iter().map(|c| c.name).collect())
    }

    async fn create_collection(
        &self,
        name: &str,
        vector_size: usize,
        distance: Distance,
    ) -> Result<(), StoreError> {
        let distance = match distance {
            Distance::Cosine => QdrantDistance::Cosine,
        };
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(vector_size as u64, distance)),
            )
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn create_keyword_index(&self, collection: &str, field: &str) -> Result<(), StoreError> {
        self.client
            .create_field_index(
                CreateFieldIndexCollectionBuilder::new(collection, field, FieldType::Keyword)
                    .wait(true),
            )
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, points: Vec<Point>) -> Result<(), StoreError> {
        let points = points
            .into_iter()
            .map(|p| Ok(PointStruct::new(p.id, p.vector, to_payload(p.payload)?)))
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let mut builder =
            SearchPointsBuilder::new(collection, request.vector, request.limit as u64)
                .score_threshold(request.score_threshold)
                .with_payload(true);
        if let Some(filter) = request.filter.as_ref().filter(|f| !f.is_empty()) {
            builder = builder.filter(to_filter(filter));
        }

        let response = self.client.search_points(builder).await.map_err(classify)?;

        Ok(response
            .result
            .into_iter()
            .filter_map(|point| {
                let id = point_id_to_string(point.id?)?;
                let payload = point
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, to_json(v)))
                    .collect();
                Some(ScoredPoint {
                    id,
                    score: point.score,
                    payload,
                })
            })
            .collect())
    }

    async fn set_payload(
        &self,
        collection: &str,
        id: &str,
        payload: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.client
            .set_payload(
                SetPayloadPointsBuilder::new(collection, to_payload(payload)?)
                    .points_selector(ids_list(&[id.to_string()]))
                    .wait(true),
            )
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn update_vector(
        &self,
        collection: &str,
        id: &str,
        vector: Vec<f32>,
    ) -> Result<(), StoreError> {
        let point = PointVectors {
            id: Some(PointId::from(id.to_string())),
            vectors: Some(vector.into()),
        };
        self.client
            .update_vectors(UpdatePointVectorsBuilder::new(collection, vec![point]).wait(true))
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[String]) -> Result<(), StoreError> {
        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(ids_list(ids))
                    .wait(true),
            )
            .await
            .map_err(classify)?;
        Ok(())
    }
}

fn ids_list(ids: &[String]) -> PointsIdsList {
    PointsIdsList {
        ids: ids.iter().cloned().map(PointId::from).collect(),
    }
}

fn to_filter(filter: &FieldFilter) -> Filter {
    Filter::must(
        filter
            .must
            .iter()
            .map(|(field, value)| Condition::matches(field.as_str(), value.clone())),
    )
}

fn to_payload(map: Map<String, Value>) -> Result<Payload, StoreError> {
    Payload::try_from(Value::Object(map))
        .map_err(|e| StoreError::Backend(format!("invalid payload: {e}")))
}

fn point_id_to_string(id: PointId) -> Option<String> {
    match id.point_id_options? {
        PointIdOptions::Uuid(uuid) => Some(uuid),
        PointIdOptions::Num(n) => Some(n.to_string()),
    }
}

/// Convert a Qdrant payload value back into JSON.
fn to_json(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Value::from(d),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => Value::Array(list.values.into_iter().map(to_json).collect()),
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(k, v)| (k, to_json(v)))
                .collect(),
        ),
    }
}

// Numeric values of `tonic::Code`.
const GRPC_NOT_FOUND: i32 = 5;
const GRPC_ALREADY_EXISTS: i32 = 6;

fn classify(err: QdrantError) -> StoreError {
    if let QdrantError::ResponseError { status } = &err {
        if let Some(classified) = classify_status(status.code() as i32, status.message()) {
            return classified;
        }
    }
    // Qdrant answers some conflicts with InvalidArgument, so fall back to the message.
    classify_message(err.to_string())
}

/// Map a gRPC status code onto the store error taxonomy, if it names one.
fn classify_status(code: i32, message: &str) -> Option<StoreError> {
    match code {
        GRPC_NOT_FOUND => Some(StoreError::NotFound(message.to_string())),
        GRPC_ALREADY_EXISTS => Some(StoreError::AlreadyExists(message.to_string())),
        _ => None,
    }
}

/// Map a Qdrant error message onto the store error taxonomy.
fn classify_message(msg: String) -> StoreError {
    let lower = msg.to_lowercase();
    if lower.contains("already exists") {
        StoreError::AlreadyExists(msg)
    } else if lower.contains("not found")
        || lower.contains("no point with id")
        || lower.contains("doesn't exist")
    {
        StoreError::NotFound(msg)
    } else {
        StoreError::Backend(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::{ListValue, Struct};
    use serde_json::json;
    use std::collections::HashMap;

    fn qv(kind: Kind) -> QdrantValue {
        QdrantValue { kind: Some(kind) }
    }

    #[test]
    fn converts_payload_values_to_json() {
        let tags = qv(Kind::ListValue(ListValue {
            values: vec![qv(Kind::StringValue("auth".into())), qv(Kind::StringValue("jwt".into()))],
        }));
        let nested = qv(Kind::StructValue(Struct {
            fields: HashMap::from([("n".to_string(), qv(Kind::IntegerValue(3)))]),
        }));

        assert_eq!(to_json(tags), json!(["auth", "jwt"]));
        assert_eq!(to_json(nested), json!({ "n": 3 }));
        assert_eq!(to_json(qv(Kind::BoolValue(true))), json!(true));
        assert_eq!(to_json(qv(Kind::DoubleValue(0.5))), json!(0.5));
        assert_eq!(to_json(QdrantValue { kind: None }), Value::Null);
    }

    #[test]
    fn classifies_server_messages() {
        assert!(matches!(
            classify_message("Wrong input: Collection `cairn_global` already exists!".into()),
            StoreError::AlreadyExists(_)
        ));
        assert!(matches!(
            classify_message("Not found: No point with id 3f2a found".into()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            classify_message("Collection `x` doesn't exist!".into()),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            classify_message("transport error: connection refused".into()),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn status_codes_take_precedence_over_messages() {
        assert!(matches!(
            classify_status(GRPC_NOT_FOUND, "collection missing"),
            Some(StoreError::NotFound(_))
        ));
        assert!(matches!(
            classify_status(GRPC_ALREADY_EXISTS, "collection present"),
            Some(StoreError::AlreadyExists(_))
        ));
        // InvalidArgument carries no kind of its own
        assert!(classify_status(3, "Collection `x` already exists!").is_none());
    }

    #[test]
    fn uuid_point_ids_round_trip() {
        let id = "0192f3a4-5b6c-7d8e-9f00-112233445566".to_string();
        assert_eq!(point_id_to_string(PointId::from(id.clone())), Some(id));
        assert_eq!(point_id_to_string(PointId::from(7u64)), Some("7".to_string()));
    }

    #[test]
    fn builds_payload_from_json_object() {
        let map = json!({ "scope": "s60", "tags": ["a"] }).as_object().cloned().unwrap();
        assert!(to_payload(map).is_ok());
    }
}
