//! Qdrant backend for the document collection and the semantic cache
//!
//! Both collections share the same `{dimension, cosine}` parameters. The
//! cache is keyed by query embeddings; a hit requires the top-1 score to
//! clear the similarity cutoff.

use crate::chunk::DocChunk;
use crate::error::{VectorDataError, VectorDataResult};
use crate::storage::traits::{SearchHit, VectorStore};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CollectionExistsRequest, CreateCollection, Distance, PointStruct, SearchPoints, UpsertPoints,
    Value, VectorParams,
};
use qdrant_client::{Payload, Qdrant};
use ragline_common::RequestContext;
use ragline_config::{RagConfig, VectorConfig};
use std::collections::HashMap;
use tracing::{debug, info};

pub struct QdrantStore {
    client: Qdrant,
    document_collection: String,
    cache_collection: String,
    dimension: u64,
    search_limit: u64,
    cache_cutoff: f32,
}

impl QdrantStore {
    /// Connect and make sure both collections exist.
    ///
    /// # Errors
    ///
    /// Returns `VectorDataError::Storage` when the server is unreachable or
    /// `VectorDataError::Collection` when bootstrap creation fails.
    pub async fn connect(vector: &VectorConfig, rag: &RagConfig) -> VectorDataResult<Self> {
        let client = Qdrant::from_url(&vector.url)
            .build()
            .map_err(|e| VectorDataError::Storage(format!("failed to create qdrant client: {e}")))?;

        let store = Self {
            client,
            document_collection: vector.document_collection.clone(),
            cache_collection: vector.cache_collection.clone(),
            dimension: vector.dimension as u64,
            search_limit: rag.search_limit as u64,
            cache_cutoff: rag.cache_similarity_cutoff,
        };

        let bootstrap_ctx = RequestContext::detached(ragline_common::TraceId::new());
        store
            .ensure_collection(&bootstrap_ctx, &vector.document_collection)
            .await?;
        store
            .ensure_collection(&bootstrap_ctx, &vector.cache_collection)
            .await?;
        Ok(store)
    }

    async fn top_k(
        &self,
        ctx: &RequestContext,
        collection: &str,
        query: &[f32],
        limit: u64,
    ) -> VectorDataResult<Vec<qdrant_client::qdrant::ScoredPoint>> {
        let request = SearchPoints {
            collection_name: collection.to_owned(),
            vector: query.to_vec(),
            limit,
            with_payload: Some(true.into()),
            ..Default::default()
        };
        let call = self.client.search_points(request);
        let response = ctx
            .run(call)
            .await
            .ok_or(VectorDataError::Cancelled)?
            .map_err(|e| VectorDataError::Storage(format!("search failed: {e}")))?;
        Ok(response.result)
    }
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> String {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}

fn payload_int(payload: &HashMap<String, Value>, key: &str) -> i64 {
    payload.get(key).and_then(|v| v.as_integer()).unwrap_or(0)
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn search(&self, ctx: &RequestContext, query: &[f32]) -> VectorDataResult<Vec<SearchHit>> {
        let points = self
            .top_k(ctx, &self.document_collection, query, self.search_limit)
            .await?;

        let hits = points
            .into_iter()
            .map(|point| SearchHit {
                content: payload_str(&point.payload, "content"),
                doc_name: payload_str(&point.payload, "doc_name"),
                page_num: payload_int(&point.payload, "page_num"),
                chunk_order: payload_int(&point.payload, "chunk_order"),
                chunk_id: payload_str(&point.payload, "chunk_id"),
                ingested_at: payload_int(&point.payload, "ingested_at"),
                source_doc_id: payload_str(&point.payload, "source_doc_id"),
                similarity: point.score,
            })
            .collect();
        Ok(hits)
    }

    async fn cached_answer(
        &self,
        ctx: &RequestContext,
        query: &[f32],
    ) -> VectorDataResult<Option<String>> {
        let points = self.top_k(ctx, &self.cache_collection, query, 1).await?;
        let Some(top) = points.into_iter().next() else {
            return Ok(None);
        };
        debug!(trace_id = %ctx.trace_id(), score = top.score, "semantic cache candidate");
        if top.score < self.cache_cutoff {
            return Ok(None);
        }
        info!(trace_id = %ctx.trace_id(), score = top.score, "semantic cache hit");
        Ok(Some(payload_str(&top.payload, "answer")))
    }

    async fn save_to_cache(
        &self,
        ctx: &RequestContext,
        id: &str,
        vector: &[f32],
        answer: &str,
    ) -> VectorDataResult<()> {
        let mut payload = HashMap::new();
        payload.insert("answer".to_owned(), Value::from(answer.to_owned()));
        payload.insert(
            "timestamp".to_owned(),
            Value::from(chrono::Utc::now().timestamp()),
        );

        let request = UpsertPoints {
            collection_name: self.cache_collection.clone(),
            points: vec![PointStruct::new(
                id.to_owned(),
                vector.to_vec(),
                Payload::from(payload),
            )],
            ..Default::default()
        };
        let call = self.client.upsert_points(request);
        ctx.run(call)
            .await
            .ok_or(VectorDataError::Cancelled)?
            .map_err(|e| VectorDataError::Storage(format!("cache upsert failed: {e}")))?;
        Ok(())
    }

    async fn ensure_collection(&self, ctx: &RequestContext, collection: &str) -> VectorDataResult<()> {
        if collection.is_empty() {
            return Err(VectorDataError::Configuration("empty collection name".into()));
        }

        let exists_request = CollectionExistsRequest {
            collection_name: collection.to_owned(),
        };
        let exists = ctx
            .run(self.client.collection_exists(exists_request))
            .await
            .ok_or(VectorDataError::Cancelled)?
            .map_err(|e| VectorDataError::Collection(format!("existence check failed: {e}")))?;
        if exists {
            return Ok(());
        }

        let request = CreateCollection {
            collection_name: collection.to_owned(),
            vectors_config: Some(
                VectorParams {
                    size: self.dimension,
                    distance: Distance::Cosine as i32,
                    ..Default::default()
                }
                .into(),
            ),
            ..Default::default()
        };
        match ctx
            .run(self.client.create_collection(request))
            .await
            .ok_or(VectorDataError::Cancelled)?
        {
            Ok(_) => Ok(()),
            Err(e) => {
                // Race with another creator is fine; the operation is
                // idempotent by contract.
                if e.to_string().contains("already exists") {
                    Ok(())
                } else {
                    Err(VectorDataError::Collection(format!(
                        "failed to create collection '{collection}': {e}"
                    )))
                }
            }
        }
    }

    async fn upsert_batch(
        &self,
        ctx: &RequestContext,
        collection: &str,
        chunks: &[DocChunk],
        vectors: &[Vec<f32>],
    ) -> VectorDataResult<()> {
        if chunks.len() != vectors.len() {
            return Err(VectorDataError::BatchMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let points: Vec<PointStruct> = chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| {
                let mut payload = HashMap::new();
                payload.insert("content".to_owned(), Value::from(chunk.text.clone()));
                payload.insert("page_num".to_owned(), Value::from(i64::from(chunk.page_num)));
                payload.insert(
                    "source_doc_id".to_owned(),
                    Value::from(chunk.doc.id.clone()),
                );
                payload.insert("doc_name".to_owned(), Value::from(chunk.doc.name.clone()));
                payload.insert(
                    "chunk_order".to_owned(),
                    Value::from(chunk.page_order as i64),
                );
                payload.insert("chunk_id".to_owned(), Value::from(chunk.chunk_id.clone()));
                payload.insert(
                    "ingested_at".to_owned(),
                    Value::from(chunk.doc.ingested_at.timestamp()),
                );
                PointStruct::new(chunk.chunk_id.clone(), vector.clone(), Payload::from(payload))
            })
            .collect();

        let request = UpsertPoints {
            collection_name: collection.to_owned(),
            wait: Some(true),
            points,
            ..Default::default()
        };
        let call = self.client.upsert_points(request);
        ctx.run(call)
            .await
            .ok_or(VectorDataError::Cancelled)?
            .map_err(|e| VectorDataError::Storage(format!("batch upsert failed: {e}")))?;

        debug!(
            trace_id = %ctx.trace_id(),
            collection,
            points = chunks.len(),
            "upserted chunk batch"
        );
        Ok(())
    }
}
