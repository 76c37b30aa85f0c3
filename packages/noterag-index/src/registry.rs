use std::{collections::HashMap, sync::Arc};

use qdrant_client::{
	Qdrant,
	qdrant::{CreateCollectionBuilder, Distance, VectorParamsBuilder},
};
use tokio::sync::RwLock;

use noterag_chunking::ChunkingConfig;

use crate::{EmbeddingProvider, Result, UserIndex, collection};

/// Hands out per-user index handles, creating the backing collection on first touch.
/// Handles are cached for the process lifetime; the registry is the only place that
/// talks to the collection-management API.
pub struct IndexRegistry {
	client: Arc<Qdrant>,
	cfg: noterag_config::Qdrant,
	chunking: ChunkingConfig,
	embedder: Arc<dyn EmbeddingProvider>,
	handles: RwLock<HashMap<Option<String>, Arc<UserIndex>>>,
}
impl IndexRegistry {
	pub fn new(
		cfg: noterag_config::Qdrant,
		chunking: noterag_config::Chunking,
		embedder: Arc<dyn EmbeddingProvider>,
	) -> Result<Self> {
		let client = Arc::new(Qdrant::from_url(&cfg.url).build()?);

		Ok(Self {
			client,
			cfg,
			chunking: ChunkingConfig {
				max_chars: chunking.max_chars,
				overlap_chars: chunking.overlap_chars,
			},
			embedder,
			handles: RwLock::new(HashMap::new()),
		})
	}

	/// Returns the cached handle for the user, or creates the collection and a fresh
	/// handle. Concurrent first touches may both issue a create; the loser treats
	/// "already exists" as success and both end up with the same handle.
	pub async fn get_or_create(&self, user: Option<&str>) -> Result<Arc<UserIndex>> {
		let key = user.map(str::to_string);

		{
			let handles = self.handles.read().await;

			if let Some(handle) = handles.get(&key) {
				return Ok(handle.clone());
			}
		}

		let name =
			collection::collection_name(&self.cfg.collection_prefix, user, self.cfg.max_collection_name_chars);

		self.ensure_collection(&name).await?;

		let mut handles = self.handles.write().await;
		let handle = handles
			.entry(key)
			.or_insert_with(|| {
				Arc::new(UserIndex::new(
					self.client.clone(),
					name,
					self.embedder.clone(),
					self.chunking.clone(),
					self.cfg.vector_dim,
				))
			})
			.clone();

		Ok(handle)
	}

	async fn ensure_collection(&self, name: &str) -> Result<()> {
		if self.client.collection_exists(name).await? {
			return Ok(());
		}

		let builder = CreateCollectionBuilder::new(name.to_string()).vectors_config(
			VectorParamsBuilder::new(self.cfg.vector_dim as u64, Distance::Cosine),
		);

		match self.client.create_collection(builder).await {
			Ok(_) => Ok(()),
			Err(err) => {
				// Lost a create race against another task or process.
				if self.client.collection_exists(name).await.unwrap_or(false) {
					return Ok(());
				}

				Err(err.into())
			},
		}
	}
}
