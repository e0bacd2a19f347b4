//! Qdrant-backed [`VectorIndex`].

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, RetrievedPoint, ScoredPoint,
    ScrollPointsBuilder, SearchPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
    VectorsOutput,
};
use tracing::info;
use uuid::Uuid;

use super::{ScoredVector, ScrollCursor, ScrollPage, VectorIndex};
use crate::error::VectorStoreError;
use crate::models::{DocumentMetadata, DocumentVector, SourceKind, VectorStoreConfig};

/// Vector engine backend speaking the Qdrant gRPC API.
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
}

impl QdrantIndex {
    pub fn new(config: &VectorStoreConfig) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|err| VectorStoreError::Connection(err.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn collection_exists(&self) -> Result<bool, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(_) => Ok(true),
            Err(err) => {
                let msg = err.to_string();
                if is_missing_collection(&msg) {
                    Ok(false)
                } else {
                    Err(VectorStoreError::Collection(msg))
                }
            }
        }
    }

    fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
        payload
            .get(key)
            .and_then(|value| match &value.kind {
                Some(Kind::StringValue(s)) => Some(s.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }

    /// Rebuilds metadata from a stored payload. Malformed or missing
    /// fields are defaulted (empty string, epoch, nil uuid), never an
    /// error: stored data must not be able to break retrieval.
    fn metadata_from_payload(
        id: Option<&PointId>,
        payload: &HashMap<String, Value>,
    ) -> DocumentMetadata {
        let id = id
            .and_then(|point_id| match &point_id.point_id_options {
                Some(PointIdOptions::Uuid(raw)) => Uuid::parse_str(raw).ok(),
                _ => None,
            })
            .unwrap_or_else(Uuid::nil);

        let scraped_at = Self::payload_str(payload, "scraped_at")
            .parse::<DateTime<Utc>>()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        let source_kind = Self::payload_str(payload, "source_type")
            .parse()
            .unwrap_or(SourceKind::Html);

        DocumentMetadata {
            id,
            url: Self::payload_str(payload, "url"),
            source_kind,
            title: Self::payload_str(payload, "title"),
            content: Self::payload_str(payload, "content"),
            scraped_at,
        }
    }

    /// Mapping for points coming out of `search`.
    fn from_scored(point: ScoredPoint) -> ScoredVector {
        ScoredVector {
            score: point.score,
            document: DocumentVector {
                metadata: Self::metadata_from_payload(point.id.as_ref(), &point.payload),
                embedding: vector_data(point.vectors),
            },
        }
    }

    /// Mapping for points coming out of `scroll`.
    fn from_retrieved(point: RetrievedPoint) -> DocumentVector {
        DocumentVector {
            metadata: Self::metadata_from_payload(point.id.as_ref(), &point.payload),
            embedding: vector_data(point.vectors),
        }
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self, vector_size: u64) -> Result<(), VectorStoreError> {
        if self.collection_exists().await? {
            return Ok(());
        }

        info!(collection = %self.collection, vector_size, "creating collection");
        let create = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(vector_size, Distance::Cosine));

        match self.client.create_collection(create).await {
            Ok(_) => Ok(()),
            Err(err) => {
                let msg = err.to_string();
                // Concurrent creators race to the same name; losing the
                // race is success.
                if msg.contains("already exists") || msg.contains("Conflict") {
                    info!(collection = %self.collection, "collection already exists");
                    Ok(())
                } else {
                    Err(VectorStoreError::Collection(msg))
                }
            }
        }
    }

    async fn upsert(&self, document: &DocumentVector) -> Result<(), VectorStoreError> {
        let meta = &document.metadata;
        let mut payload: HashMap<String, Value> = HashMap::new();
        payload.insert("url".to_string(), meta.url.clone().into());
        payload.insert("source_type".to_string(), meta.source_kind.to_string().into());
        payload.insert("title".to_string(), meta.title.clone().into());
        payload.insert("content".to_string(), meta.content.clone().into());
        payload.insert("scraped_at".to_string(), meta.scraped_at.to_rfc3339().into());

        let point = PointStruct::new(meta.id.to_string(), document.embedding.clone(), payload);

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, vec![point]))
            .await
            .map_err(|err| VectorStoreError::Upsert(err.to_string()))?;

        Ok(())
    }

    async fn nearest(
        &self,
        embedding: &[f32],
        limit: u64,
    ) -> Result<Vec<ScoredVector>, VectorStoreError> {
        let search = SearchPointsBuilder::new(&self.collection, embedding.to_vec(), limit)
            .with_payload(true)
            .with_vectors(true);

        let response = match self.client.search_points(search).await {
            Ok(response) => response,
            Err(err) => {
                let msg = err.to_string();
                // An index nobody has written to yet is empty, not broken.
                if is_missing_collection(&msg) {
                    return Ok(Vec::new());
                }
                return Err(VectorStoreError::Search(msg));
            }
        };

        Ok(response.result.into_iter().map(Self::from_scored).collect())
    }

    async fn scroll(
        &self,
        limit: u32,
        cursor: Option<ScrollCursor>,
    ) -> Result<ScrollPage, VectorStoreError> {
        let mut builder = ScrollPointsBuilder::new(&self.collection)
            .limit(limit)
            .with_payload(true)
            .with_vectors(true);

        if let Some(cursor) = cursor {
            builder = builder.offset(PointId::from(cursor));
        }

        let response = match self.client.scroll(builder).await {
            Ok(response) => response,
            Err(err) => {
                let msg = err.to_string();
                if is_missing_collection(&msg) {
                    return Ok(ScrollPage::default());
                }
                return Err(VectorStoreError::Scroll(msg));
            }
        };

        let next = response
            .next_page_offset
            .and_then(|point_id| match point_id.point_id_options {
                Some(PointIdOptions::Uuid(raw)) => Some(raw),
                Some(PointIdOptions::Num(num)) => Some(num.to_string()),
                None => None,
            });

        Ok(ScrollPage {
            documents: response
                .result
                .into_iter()
                .map(Self::from_retrieved)
                .collect(),
            next,
        })
    }
}

fn vector_data(vectors: Option<VectorsOutput>) -> Vec<f32> {
    match vectors.and_then(|output| output.vectors_options) {
        Some(VectorsOptions::Vector(vector)) => vector.data,
        _ => Vec::new(),
    }
}

fn is_missing_collection(message: &str) -> bool {
    message.contains("not found") || message.contains("doesn't exist")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_value(s: &str) -> Value {
        s.to_string().into()
    }

    #[test]
    fn test_metadata_from_complete_payload() {
        let id = Uuid::new_v4();
        let point_id = PointId::from(id.to_string());
        let mut payload = HashMap::new();
        payload.insert("url".to_string(), string_value("http://example.com"));
        payload.insert("source_type".to_string(), string_value("pdf"));
        payload.insert("title".to_string(), string_value("Page 2"));
        payload.insert("content".to_string(), string_value("body text"));
        payload.insert(
            "scraped_at".to_string(),
            string_value("2025-06-01T12:00:00+00:00"),
        );

        let metadata = QdrantIndex::metadata_from_payload(Some(&point_id), &payload);
        assert_eq!(metadata.id, id);
        assert_eq!(metadata.url, "http://example.com");
        assert_eq!(metadata.source_kind, SourceKind::Pdf);
        assert_eq!(metadata.title, "Page 2");
        assert_eq!(metadata.content, "body text");
        assert_eq!(metadata.scraped_at.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn test_metadata_defaults_on_malformed_payload() {
        let mut payload = HashMap::new();
        payload.insert("scraped_at".to_string(), string_value("yesterday-ish"));

        let point_id = PointId::from("not-a-uuid".to_string());
        let metadata = QdrantIndex::metadata_from_payload(Some(&point_id), &payload);

        assert_eq!(metadata.id, Uuid::nil());
        assert_eq!(metadata.url, "");
        assert_eq!(metadata.source_kind, SourceKind::Html);
        assert_eq!(metadata.scraped_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_metadata_defaults_on_missing_id() {
        let metadata = QdrantIndex::metadata_from_payload(None, &HashMap::new());
        assert_eq!(metadata.id, Uuid::nil());
        assert_eq!(metadata.scraped_at, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_vector_data_absent() {
        assert!(vector_data(None).is_empty());
    }
}
