mod collection;
mod error;
mod index;
mod registry;

pub use collection::sanitize_identity;
pub use error::{Error, Result};
pub use index::{DocHit, UserIndex};
pub use registry::IndexRegistry;

use std::{future::Future, pin::Pin, sync::Arc};

use time::OffsetDateTime;

use noterag_config::EmbeddingProviderConfig;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Produces one vector per input text, in input order. Implemented over an HTTP
/// provider in production and by deterministic stubs in tests.
pub trait EmbeddingProvider: Send + Sync {
	fn embed<'a>(&'a self, texts: &'a [String])
	-> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub struct DefaultEmbedding {
	cfg: EmbeddingProviderConfig,
}
impl DefaultEmbedding {
	pub fn new(cfg: EmbeddingProviderConfig) -> Arc<Self> {
		Arc::new(Self { cfg })
	}
}
impl EmbeddingProvider for DefaultEmbedding {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { noterag_providers::embedding::embed(&self.cfg, texts).await })
	}
}

/// Relational fields carried into each chunk's payload so search hits can be
/// attributed without a second lookup.
#[derive(Clone, Debug)]
pub struct NoteMetadata {
	pub user_id: String,
	pub title: String,
	pub created_at: OffsetDateTime,
}
