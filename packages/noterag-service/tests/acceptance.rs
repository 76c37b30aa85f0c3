//! End-to-end service tests against live Postgres and Qdrant instances. Set
//! `NOTERAG_PG_DSN` and `NOTERAG_QDRANT_URL` to run them; they skip otherwise.

use std::{
	hash::{DefaultHasher, Hash, Hasher},
	sync::{
		Arc, Mutex,
		atomic::{AtomicUsize, Ordering},
	},
};

use noterag_config::{
	Chunking, Config, EmbeddingProviderConfig, LlmProviderConfig, Postgres, Providers, Qdrant,
	Retrieval, Service, Storage,
};
use noterag_index::{BoxFuture as IndexFuture, EmbeddingProvider};
use noterag_service::{
	BoxFuture, CompletionProvider, CreateNoteRequest, Error, NoteService,
	answer::{FAILED_ANSWER, NO_CONTEXT_ANSWER, STALE_CONTEXT_ANSWER},
};
use noterag_storage::db::Db;
use noterag_testkit::TestDatabase;

const VECTOR_DIM: u32 = 16;

/// Deterministic bag-of-words embedding: each word lands in a hashed bucket and the
/// result is L2-normalized, so cosine similarity tracks word overlap.
struct StubEmbedding;
impl EmbeddingProvider for StubEmbedding {
	fn embed<'a>(
		&'a self,
		texts: &'a [String],
	) -> IndexFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|text| stub_vector(text)).collect::<Vec<_>>();

		Box::pin(async move { Ok(vectors) })
	}
}

fn stub_vector(text: &str) -> Vec<f32> {
	let mut vector = vec![0.0_f32; VECTOR_DIM as usize];

	for word in text.to_lowercase().split_whitespace() {
		let word = word.trim_matches(|c: char| !c.is_alphanumeric());

		if word.is_empty() {
			continue;
		}

		let mut hasher = DefaultHasher::new();

		word.hash(&mut hasher);

		vector[(hasher.finish() % VECTOR_DIM as u64) as usize] += 1.0;
	}

	let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm > 0.0 {
		for x in &mut vector {
			*x /= norm;
		}
	}

	vector
}

struct SpyCompletion {
	calls: Arc<AtomicUsize>,
	last_prompt: Mutex<Option<String>>,
	reply: String,
}
impl SpyCompletion {
	fn new(reply: &str) -> (Arc<Self>, Arc<AtomicUsize>) {
		let calls = Arc::new(AtomicUsize::new(0));
		let spy = Arc::new(Self {
			calls: calls.clone(),
			last_prompt: Mutex::new(None),
			reply: reply.to_string(),
		});

		(spy, calls)
	}

	fn last_prompt(&self) -> Option<String> {
		self.last_prompt.lock().unwrap().clone()
	}
}
impl CompletionProvider for SpyCompletion {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		*self.last_prompt.lock().unwrap() = Some(prompt.to_string());

		let reply = self.reply.clone();

		Box::pin(async move { Ok(reply) })
	}
}

struct FailingCompletion;
impl CompletionProvider for FailingCompletion {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_prompt: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move { Err(color_eyre::eyre::eyre!("completion backend unavailable")) })
	}
}

fn test_config(dsn: String, qdrant_url: String, collection_prefix: String) -> Config {
	Config {
		service: Service { http_bind: "127.0.0.1:0".to_string(), log_level: "info".to_string() },
		storage: Storage {
			postgres: Postgres { dsn, pool_max_conns: 2 },
			qdrant: Qdrant {
				url: qdrant_url,
				collection_prefix,
				vector_dim: VECTOR_DIM,
				max_collection_name_chars: 255,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				api_base: "http://127.0.0.1:0".to_string(),
				api_key: "unused".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "stub".to_string(),
				dimensions: VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
			llm: LlmProviderConfig {
				api_base: "http://127.0.0.1:0".to_string(),
				api_key: "unused".to_string(),
				path: "/v1/chat/completions".to_string(),
				model: "stub".to_string(),
				temperature: 0.1,
				max_tokens: 512,
				timeout_ms: 1_000,
				default_headers: Default::default(),
			},
		},
		chunking: Chunking { max_chars: 512, overlap_chars: 64 },
		retrieval: Retrieval { search_limit: 10, answer_top_k: 3 },
	}
}

async fn setup(
	test_db: &TestDatabase,
	qdrant_url: String,
	completion: Arc<dyn CompletionProvider>,
) -> NoteService {
	let cfg =
		test_config(test_db.dsn().to_string(), qdrant_url, test_db.collection_prefix());
	let db = Db::connect(&cfg.storage.postgres).await.expect("connect failed");

	db.ensure_schema().await.expect("schema setup failed");

	NoteService::with_providers(cfg, db, Arc::new(StubEmbedding), completion)
		.expect("service setup failed")
}

macro_rules! require_backends {
	($test_name:literal) => {{
		let Some(dsn) = noterag_testkit::env_dsn() else {
			eprintln!(concat!("Skipping ", $test_name, "; set NOTERAG_PG_DSN to run this test."));

			return;
		};
		let Some(qdrant_url) = noterag_testkit::env_qdrant_url() else {
			eprintln!(concat!(
				"Skipping ",
				$test_name,
				"; set NOTERAG_QDRANT_URL to run this test."
			));

			return;
		};

		(dsn, qdrant_url)
	}};
}

#[tokio::test]
async fn note_round_trip_create_get_list_delete() {
	let (dsn, qdrant_url) = require_backends!("note_round_trip_create_get_list_delete");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, _) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let created = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Pick up the dry cleaning on Thursday.".to_string(),
				title: Some("Errands".to_string()),
			},
		)
		.await
		.expect("create failed");

	assert!(created.id.starts_with("note_"));
	assert_eq!(created.title, "Errands");
	assert!(created.indexed);

	let fetched = service.get_note("alice@example.com", &created.id).await.expect("get failed");

	assert_eq!(fetched.text, "Pick up the dry cleaning on Thursday.");
	assert_eq!(fetched.title, "Errands");

	let listed = service.list_notes("alice@example.com").await.expect("list failed");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].id, created.id);

	let deleted =
		service.delete_note("alice@example.com", &created.id).await.expect("delete failed");

	assert!(deleted.vector_cleanup);
	assert!(matches!(
		service.get_note("alice@example.com", &created.id).await,
		Err(Error::NoteNotFound { .. })
	));

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn untitled_notes_get_the_default_title() {
	let (dsn, qdrant_url) = require_backends!("untitled_notes_get_the_default_title");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, _) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let created = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest { text: "No title here.".to_string(), title: None },
		)
		.await
		.expect("create failed");

	assert_eq!(created.title, "Untitled Note");

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn search_is_scoped_to_the_user_and_similarity_ordered() {
	let (dsn, qdrant_url) = require_backends!("search_is_scoped_to_the_user_and_similarity_ordered");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, _) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let sushi = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Tokyo sushi tour plans for spring.".to_string(),
				title: Some("Trip".to_string()),
			},
		)
		.await
		.expect("create failed");
	let budget = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Quarterly budget review meeting agenda.".to_string(),
				title: Some("Work".to_string()),
			},
		)
		.await
		.expect("create failed");

	service
		.create_note(
			"bob@example.com",
			CreateNoteRequest {
				text: "Tokyo sushi tour plans for spring.".to_string(),
				title: Some("Bob's trip".to_string()),
			},
		)
		.await
		.expect("create failed");

	let items = service
		.search("alice@example.com", "tokyo sushi tour", None)
		.await
		.expect("search failed");

	assert!(!items.is_empty());
	assert_eq!(items[0].id, sushi.id);
	assert!(items.iter().all(|item| item.id != budget.id || item.score < items[0].score));
	// Bob's identical note never leaks into Alice's results.
	assert!(items.iter().all(|item| item.id == sushi.id || item.id == budget.id));

	for window in items.windows(2) {
		assert!(window[0].score >= window[1].score);
	}

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn search_on_an_empty_store_returns_no_items() {
	let (dsn, qdrant_url) = require_backends!("search_on_an_empty_store_returns_no_items");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, _) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let items =
		service.search("alice@example.com", "anything at all", None).await.expect("search failed");

	assert!(items.is_empty());

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn deleted_notes_leave_search_results() {
	let (dsn, qdrant_url) = require_backends!("deleted_notes_leave_search_results");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, _) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let created = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Remember the conference registration deadline.".to_string(),
				title: None,
			},
		)
		.await
		.expect("create failed");
	let before = service
		.search("alice@example.com", "conference registration deadline", None)
		.await
		.expect("search failed");

	assert!(before.iter().any(|item| item.id == created.id));

	let deleted =
		service.delete_note("alice@example.com", &created.id).await.expect("delete failed");

	assert!(deleted.vector_cleanup);

	let after = service
		.search("alice@example.com", "conference registration deadline", None)
		.await
		.expect("search failed");

	assert!(after.iter().all(|item| item.id != created.id));

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn answer_short_circuits_when_nothing_is_retrieved() {
	let (dsn, qdrant_url) = require_backends!("answer_short_circuits_when_nothing_is_retrieved");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, calls) = SpyCompletion::new("should never be returned");
	let service = setup(&test_db, qdrant_url, spy).await;
	let response = service
		.answer("alice@example.com", "What did I plan for spring?", None)
		.await
		.expect("answer failed");

	assert_eq!(response.answer, NO_CONTEXT_ANSWER);
	assert!(response.sources.is_empty());
	assert_eq!(calls.load(Ordering::SeqCst), 0);

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn answer_feeds_retrieved_notes_to_the_model() {
	let (dsn, qdrant_url) = require_backends!("answer_feeds_retrieved_notes_to_the_model");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, calls) = SpyCompletion::new("You planned a Tokyo sushi tour.");
	let service = setup(&test_db, qdrant_url, spy.clone()).await;
	let created = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Tokyo sushi tour plans for spring.".to_string(),
				title: Some("Trip".to_string()),
			},
		)
		.await
		.expect("create failed");
	let response = service
		.answer("alice@example.com", "What did I plan for spring?", None)
		.await
		.expect("answer failed");

	assert_eq!(response.answer, "You planned a Tokyo sushi tour.");
	assert_eq!(calls.load(Ordering::SeqCst), 1);
	assert!(response.sources.iter().any(|source| source.id == created.id));
	assert!(
		response
			.sources
			.iter()
			.any(|source| source.title.as_deref() == Some("Trip"))
	);

	let prompt = spy.last_prompt().expect("no prompt captured");

	assert!(prompt.contains("Tokyo sushi tour plans for spring."));
	assert!(prompt.contains("Note Title: Trip"));
	assert!(prompt.contains("Question: What did I plan for spring?"));

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn answer_maps_completion_failure_to_a_degraded_reply() {
	let (dsn, qdrant_url) = require_backends!("answer_maps_completion_failure_to_a_degraded_reply");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let service = setup(&test_db, qdrant_url, Arc::new(FailingCompletion)).await;

	service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Tokyo sushi tour plans for spring.".to_string(),
				title: None,
			},
		)
		.await
		.expect("create failed");

	let response = service
		.answer("alice@example.com", "What did I plan for spring?", None)
		.await
		.expect("answer failed");

	assert_eq!(response.answer, FAILED_ANSWER);
	assert!(response.sources.is_empty());

	test_db.cleanup().await.expect("cleanup failed");
}

#[tokio::test]
async fn stale_vector_hits_are_skipped_and_reported() {
	let (dsn, qdrant_url) = require_backends!("stale_vector_hits_are_skipped_and_reported");
	let test_db = TestDatabase::new(&dsn).await.expect("test database failed");
	let (spy, calls) = SpyCompletion::new("unused");
	let service = setup(&test_db, qdrant_url, spy).await;
	let created = service
		.create_note(
			"alice@example.com",
			CreateNoteRequest {
				text: "Tokyo sushi tour plans for spring.".to_string(),
				title: None,
			},
		)
		.await
		.expect("create failed");

	// Remove the relational row behind the service's back, leaving vectors in place.
	sqlx::query("DELETE FROM notes WHERE id = $1")
		.bind(&created.id)
		.execute(&service.db.pool)
		.await
		.expect("raw delete failed");

	let items = service
		.search("alice@example.com", "tokyo sushi tour", None)
		.await
		.expect("search failed");

	assert!(items.is_empty());

	let response = service
		.answer("alice@example.com", "What did I plan for spring?", None)
		.await
		.expect("answer failed");

	assert_eq!(response.answer, STALE_CONTEXT_ANSWER);
	assert!(response.sources.iter().any(|source| source.id == created.id));
	assert!(response.sources.iter().all(|source| source.title.is_none()));
	assert_eq!(calls.load(Ordering::SeqCst), 0);

	test_db.cleanup().await.expect("cleanup failed");
}
