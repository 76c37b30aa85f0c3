mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chunking, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant,
	Retrieval, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.dsn.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.postgres.dsn must be non-empty.".to_string(),
		});
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::Validation {
			message: "storage.postgres.pool_max_conns must be greater than zero.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection_prefix.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must be non-empty.".to_string(),
		});
	}
	if !cfg
		.storage
		.qdrant
		.collection_prefix
		.chars()
		.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
	{
		return Err(Error::Validation {
			message: "storage.qdrant.collection_prefix must only contain [A-Za-z0-9_-]."
				.to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	// The prefix, separator, and at least one identity character must fit.
	if cfg.storage.qdrant.max_collection_name_chars
		<= cfg.storage.qdrant.collection_prefix.len() + 1
	{
		return Err(Error::Validation {
			message: "storage.qdrant.max_collection_name_chars is too small for the prefix."
				.to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.llm.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm.max_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.max_chars == 0 {
		return Err(Error::Validation {
			message: "chunking.max_chars must be greater than zero.".to_string(),
		});
	}
	if cfg.chunking.overlap_chars >= cfg.chunking.max_chars {
		return Err(Error::Validation {
			message: "chunking.overlap_chars must be less than chunking.max_chars.".to_string(),
		});
	}
	if cfg.retrieval.search_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.search_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.answer_top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.answer_top_k must be greater than zero.".to_string(),
		});
	}

	for (label, key) in
		[("embedding", &cfg.providers.embedding.api_key), ("llm", &cfg.providers.llm.api_key)]
	{
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}
