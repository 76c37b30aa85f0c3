mod error;

pub use error::{Error, Result};

use std::{collections::HashSet, env, str::FromStr, sync::Mutex};

use qdrant_client::Qdrant;
use sqlx::{
	ConnectOptions, Connection, Executor,
	postgres::{PgConnectOptions, PgConnection},
};
use uuid::Uuid;

const ADMIN_DATABASES: [&str; 2] = ["postgres", "template1"];

/// A scratch Postgres database plus the Qdrant collections a test created against it.
/// Call [`TestDatabase::cleanup`] at the end of the test; acceptance tests that bail out
/// early leak nothing beyond an empty database.
pub struct TestDatabase {
	name: String,
	dsn: String,
	admin_options: PgConnectOptions,
	cleaned: bool,
	collections: Mutex<HashSet<String>>,
}
impl TestDatabase {
	pub async fn new(base_dsn: &str) -> Result<Self> {
		let base_options: PgConnectOptions = PgConnectOptions::from_str(base_dsn)
			.map_err(|err| Error::Message(format!("Failed to parse NOTERAG_PG_DSN: {err}.")))?;
		let (admin_options, mut admin_conn) = connect_admin(&base_options).await?;
		let name = format!("noterag_test_{}", Uuid::new_v4().simple());
		let create_sql = format!(r#"CREATE DATABASE "{}""#, name);

		admin_conn
			.execute(create_sql.as_str())
			.await
			.map_err(|err| Error::Message(format!("Failed to create test database: {err}.")))?;

		let dsn = base_options.clone().database(&name).to_url_lossy().to_string();

		Ok(Self { name, dsn, admin_options, cleaned: false, collections: Mutex::new(HashSet::new()) })
	}

	pub fn dsn(&self) -> &str {
		&self.dsn
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Derives a collection prefix unique to this scratch database and tracks it for
	/// cleanup. Tests pass the returned value as `storage.qdrant.collection_prefix`.
	pub fn collection_prefix(&self) -> String {
		let prefix = format!("noterag_{}", &self.name[self.name.len() - 12..]);
		let mut tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

		tracked.insert(prefix.clone());

		prefix
	}

	pub async fn cleanup(mut self) -> Result<()> {
		if self.cleaned {
			return Ok(());
		}

		let prefixes = {
			let tracked = self.collections.lock().unwrap_or_else(|err| err.into_inner());

			tracked.iter().cloned().collect::<Vec<_>>()
		};
		let db_result = cleanup_database(&self.name, &self.admin_options).await;
		let qdrant_result = cleanup_qdrant_collections(&prefixes).await;

		db_result?;
		qdrant_result?;

		self.cleaned = true;

		Ok(())
	}
}

pub fn env_dsn() -> Option<String> {
	env::var("NOTERAG_PG_DSN").ok()
}

pub fn env_qdrant_url() -> Option<String> {
	env::var("NOTERAG_QDRANT_URL").ok()
}

async fn connect_admin(
	base_options: &PgConnectOptions,
) -> Result<(PgConnectOptions, PgConnection)> {
	let mut last_err = None;

	for database in ADMIN_DATABASES {
		let options = base_options.clone().database(database);

		match PgConnection::connect_with(&options).await {
			Ok(conn) => return Ok((options, conn)),
			Err(err) => {
				last_err = Some(err);
			},
		}
	}

	Err(Error::Message(format!("Failed to connect to an admin database: {last_err:?}.")))
}

async fn cleanup_database(name: &str, admin_options: &PgConnectOptions) -> Result<()> {
	let mut conn = PgConnection::connect_with(admin_options).await.map_err(|err| {
		Error::Message(format!("Failed to connect to admin database for cleanup: {err}."))
	})?;
	let _ = sqlx::query(
		"\
SELECT pg_terminate_backend(pid)
FROM pg_stat_activity
WHERE datname = $1 AND pid <> pg_backend_pid()",
	)
	.bind(name)
	.fetch_all(&mut conn)
	.await;
	let drop_sql = format!(r#"DROP DATABASE IF EXISTS "{}""#, name);

	sqlx::query(drop_sql.as_str())
		.execute(&mut conn)
		.await
		.map_err(|err| Error::Message(format!("Failed to drop test database: {err}.")))?;

	Ok(())
}

/// Deletes every collection whose name starts with one of the tracked prefixes. The
/// service derives per-user collections from the prefix, so the testkit cannot know the
/// exact names up front.
async fn cleanup_qdrant_collections(prefixes: &[String]) -> Result<()> {
	if prefixes.is_empty() {
		return Ok(());
	}

	let Some(qdrant_url) = env_qdrant_url() else {
		eprintln!("Skipping Qdrant cleanup; set NOTERAG_QDRANT_URL to delete test collections.");

		return Ok(());
	};
	let client = Qdrant::from_url(&qdrant_url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))?;
	let existing = client
		.list_collections()
		.await
		.map_err(|err| Error::Message(format!("Failed to list Qdrant collections: {err}.")))?;

	for collection in existing.collections.into_iter().map(|c| c.name) {
		if !prefixes.iter().any(|prefix| collection.starts_with(prefix.as_str())) {
			continue;
		}

		client.delete_collection(collection.clone()).await.map_err(|err| {
			Error::Message(format!("Failed to delete Qdrant collection {collection:?}: {err}."))
		})?;
	}

	Ok(())
}
