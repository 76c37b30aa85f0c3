use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Payload, Qdrant,
	qdrant::{
		Condition, DeletePointsBuilder, Filter, PointStruct, Query, QueryPointsBuilder,
		ScoredPoint, UpsertPointsBuilder, Value, value::Kind,
	},
};
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

use noterag_chunking::ChunkingConfig;

use crate::{EmbeddingProvider, Error, NoteMetadata, Result};

/// One note's place in the retrieval results: the owning note id plus the best
/// similarity score among its chunks.
#[derive(Clone, Debug)]
pub struct DocHit {
	pub doc_id: String,
	pub score: f32,
}

/// Handle onto a single user's collection. All chunking, embedding, and point
/// bookkeeping for that user flows through here; callers only ever speak in note ids
/// and raw text.
pub struct UserIndex {
	client: Arc<Qdrant>,
	collection: String,
	embedder: Arc<dyn EmbeddingProvider>,
	chunking: ChunkingConfig,
	vector_dim: u32,
}
impl UserIndex {
	pub(crate) fn new(
		client: Arc<Qdrant>,
		collection: String,
		embedder: Arc<dyn EmbeddingProvider>,
		chunking: ChunkingConfig,
		vector_dim: u32,
	) -> Self {
		Self { client, collection, embedder, chunking, vector_dim }
	}

	pub fn collection(&self) -> &str {
		&self.collection
	}

	/// Chunks, embeds, and upserts one note. Point ids are derived from
	/// `<note_id>:<chunk_index>`, so re-indexing the same note overwrites its points
	/// in place. Whitespace-only text indexes nothing and is not an error.
	pub async fn upsert(&self, note_id: &str, text: &str, meta: &NoteMetadata) -> Result<()> {
		let chunks = noterag_chunking::split_text(text, &self.chunking);

		if chunks.is_empty() {
			tracing::warn!(note_id = %note_id, "Note has no indexable text; skipping upsert.");

			return Ok(());
		}

		let texts = chunks.iter().map(|chunk| chunk.text.clone()).collect::<Vec<_>>();
		let vectors = self.embed_checked(&texts).await?;
		let created_at = meta.created_at.format(&Rfc3339).map_err(|err| {
			Error::InvalidArgument(format!("Failed to format created_at timestamp: {err}."))
		})?;
		let mut points = Vec::with_capacity(chunks.len());

		for (chunk, vector) in chunks.iter().zip(vectors) {
			let point_id =
				Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{note_id}:{}", chunk.chunk_index).as_bytes());
			let mut payload_map = HashMap::new();

			payload_map.insert("doc_id".to_string(), Value::from(note_id.to_string()));
			payload_map.insert("chunk_index".to_string(), Value::from(chunk.chunk_index as i64));
			payload_map.insert("user_id".to_string(), Value::from(meta.user_id.clone()));
			payload_map.insert("title".to_string(), Value::from(meta.title.clone()));
			payload_map.insert("created_at".to_string(), Value::from(created_at.clone()));

			points.push(PointStruct::new(
				point_id.to_string(),
				vector,
				Payload::from(payload_map),
			));
		}

		self.client
			.upsert_points(UpsertPointsBuilder::new(self.collection.clone(), points).wait(true))
			.await?;

		Ok(())
	}

	/// Removes every point belonging to the note. Deleting a note that was never
	/// indexed is a no-op on the vector side.
	pub async fn delete(&self, note_id: &str) -> Result<()> {
		let filter = Filter::must([Condition::matches("doc_id", note_id.to_string())]);

		self.client
			.delete_points(
				DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true),
			)
			.await?;

		Ok(())
	}

	/// Embeds the query text and returns note-level hits in descending similarity
	/// order, at most one per note.
	pub async fn query(&self, text: &str, top_k: u32) -> Result<Vec<DocHit>> {
		let vectors = self.embed_checked(&[text.to_string()]).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vector for query.".to_string(),
			});
		};
		let response = self
			.client
			.query(
				QueryPointsBuilder::new(self.collection.clone())
					.query(Query::new_nearest(vector))
					.with_payload(true)
					.limit(top_k as u64),
			)
			.await?;

		Ok(collect_doc_hits(&response.result))
	}

	async fn embed_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		let vectors = self
			.embedder
			.embed(texts)
			.await
			.map_err(|err| Error::Provider { message: err.to_string() })?;

		if vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} texts.",
					vectors.len(),
					texts.len()
				),
			});
		}
		for vector in &vectors {
			if vector.len() != self.vector_dim as usize {
				return Err(Error::Provider {
					message: "Embedding vector dimension mismatch.".to_string(),
				});
			}
		}

		Ok(vectors)
	}
}

/// Collapses chunk-level hits into note-level hits. Points arrive in descending
/// score order, so keeping the first occurrence of each `doc_id` keeps its best
/// chunk. Points without a string `doc_id` payload are skipped.
pub(crate) fn collect_doc_hits(points: &[ScoredPoint]) -> Vec<DocHit> {
	let mut hits: Vec<DocHit> = Vec::with_capacity(points.len());

	for point in points {
		let doc_id = point
			.payload
			.get("doc_id")
			.and_then(|value| match value.kind.as_ref() {
				Some(Kind::StringValue(s)) => Some(s.clone()),
				_ => None,
			});
		let Some(doc_id) = doc_id else {
			tracing::warn!(score = point.score, "Search hit has no doc_id payload; skipping.");

			continue;
		};

		if hits.iter().any(|hit| hit.doc_id == doc_id) {
			continue;
		}

		hits.push(DocHit { doc_id, score: point.score });
	}

	hits
}
