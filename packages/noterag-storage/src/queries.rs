use sqlx::{Postgres, Transaction};

use crate::{Result, db::Db, models::Note};

pub async fn insert_note_tx(tx: &mut Transaction<'_, Postgres>, note: &Note) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO notes (
	id,
	user_id,
	title,
	text,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6)",
	)
	.bind(note.id.as_str())
	.bind(note.user_id.as_str())
	.bind(note.title.as_str())
	.bind(note.text.as_str())
	.bind(note.created_at)
	.bind(note.updated_at)
	.execute(&mut **tx)
	.await?;

	Ok(())
}

/// Ownership-scoped single fetch. A foreign note id resolves to `None` exactly like a
/// missing one.
pub async fn fetch_note(db: &Db, user_id: &str, note_id: &str) -> Result<Option<Note>> {
	let note = sqlx::query_as::<_, Note>(
		"SELECT id, user_id, title, text, created_at, updated_at FROM notes WHERE id = $1 AND user_id = $2",
	)
	.bind(note_id)
	.bind(user_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(note)
}

/// Batched ownership-scoped fetch for retrieval joins. Row order is the database's own;
/// callers re-order by similarity rank.
pub async fn fetch_notes_by_ids(db: &Db, user_id: &str, note_ids: &[String]) -> Result<Vec<Note>> {
	if note_ids.is_empty() {
		return Ok(Vec::new());
	}

	let notes = sqlx::query_as::<_, Note>(
		"SELECT id, user_id, title, text, created_at, updated_at FROM notes WHERE user_id = $1 AND id = ANY($2)",
	)
	.bind(user_id)
	.bind(note_ids)
	.fetch_all(&db.pool)
	.await?;

	Ok(notes)
}

pub async fn list_notes(db: &Db, user_id: &str) -> Result<Vec<Note>> {
	let notes = sqlx::query_as::<_, Note>(
		"SELECT id, user_id, title, text, created_at, updated_at FROM notes WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
	)
	.bind(user_id)
	.fetch_all(&db.pool)
	.await?;

	Ok(notes)
}

/// Returns `true` when a row was removed. The relational delete is the authoritative
/// side of the two-store lifecycle; vector cleanup follows outside this transaction.
pub async fn delete_note_tx(
	tx: &mut Transaction<'_, Postgres>,
	user_id: &str,
	note_id: &str,
) -> Result<bool> {
	let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
		.bind(note_id)
		.bind(user_id)
		.execute(&mut **tx)
		.await?;

	Ok(result.rows_affected() > 0)
}
