use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub chunking: Chunking,
	pub retrieval: Retrieval,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Qdrant {
	pub url: String,
	/// Prefix for per-user collection names, e.g. "noterag" yields "noterag_<user>".
	pub collection_prefix: String,
	pub vector_dim: u32,
	#[serde(default = "default_max_collection_name_chars")]
	pub max_collection_name_chars: usize,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmProviderConfig {
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Chunking {
	pub max_chars: usize,
	pub overlap_chars: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Retrieval {
	#[serde(default = "default_search_limit")]
	pub search_limit: u32,
	#[serde(default = "default_answer_top_k")]
	pub answer_top_k: u32,
}

fn default_max_collection_name_chars() -> usize {
	255
}

fn default_search_limit() -> u32 {
	10
}

fn default_answer_top_k() -> u32 {
	3
}
