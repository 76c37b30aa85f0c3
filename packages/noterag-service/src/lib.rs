pub mod answer;
pub mod notes;
pub mod search;
pub mod time_serde;

pub use answer::{AnswerResponse, AnswerSource};
pub use notes::{CreateNoteRequest, CreateNoteResponse, DeleteNoteResponse, NoteView};
pub use search::SearchItem;

use std::{future::Future, pin::Pin, sync::Arc};

use noterag_config::{Config, LlmProviderConfig};
use noterag_index::{DefaultEmbedding, EmbeddingProvider, IndexRegistry};
use noterag_storage::db::Db;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	InvalidRequest { message: String },

	#[error("Note {note_id} was not found.")]
	NoteNotFound { note_id: String },

	#[error("Completion provider failed: {message}")]
	Provider { message: String },

	#[error(transparent)]
	Index(#[from] noterag_index::Error),

	#[error(transparent)]
	Storage(#[from] noterag_storage::Error),
}

/// Runs one chat completion against the configured LLM. Production uses the HTTP
/// provider; tests substitute spies to assert when the model is (not) called.
pub trait CompletionProvider: Send + Sync {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub struct DefaultCompletion;
impl CompletionProvider for DefaultCompletion {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move { noterag_providers::completion::complete(cfg, prompt).await })
	}
}

pub struct NoteService {
	pub cfg: Config,
	pub db: Db,
	pub indexes: Arc<IndexRegistry>,
	pub completion: Arc<dyn CompletionProvider>,
}
impl NoteService {
	pub async fn new(cfg: Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;

		db.ensure_schema().await?;

		let embedder = DefaultEmbedding::new(cfg.providers.embedding.clone());

		Self::with_providers(cfg, db, embedder, Arc::new(DefaultCompletion))
	}

	/// Wires the service with caller-supplied providers. Connection and schema setup
	/// stay with the caller, which lets acceptance tests point at scratch databases.
	pub fn with_providers(
		cfg: Config,
		db: Db,
		embedder: Arc<dyn EmbeddingProvider>,
		completion: Arc<dyn CompletionProvider>,
	) -> color_eyre::Result<Self> {
		let indexes =
			Arc::new(IndexRegistry::new(cfg.storage.qdrant.clone(), cfg.chunking.clone(), embedder)?);

		Ok(Self { cfg, db, indexes, completion })
	}
}
