use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use noterag_index::NoteMetadata;
use noterag_storage::{models::Note, queries};

use crate::{Error, NoteService, Result};

pub const DEFAULT_TITLE: &str = "Untitled Note";

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
	pub text: String,
	#[serde(default)]
	pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateNoteResponse {
	pub id: String,
	pub title: String,
	/// `false` means the note is stored but its vectors are missing; the failure was
	/// logged for reconciliation and reads still work.
	pub indexed: bool,
}

#[derive(Debug, Serialize)]
pub struct NoteView {
	pub id: String,
	pub title: String,
	pub text: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl From<Note> for NoteView {
	fn from(note: Note) -> Self {
		Self {
			id: note.id,
			title: note.title,
			text: note.text,
			created_at: note.created_at,
			updated_at: note.updated_at,
		}
	}
}

#[derive(Debug, Serialize)]
pub struct DeleteNoteResponse {
	pub id: String,
	/// `false` means stale vectors may remain; the failure was logged for
	/// reconciliation and they can only surface as skipped hits.
	pub vector_cleanup: bool,
}

impl NoteService {
	/// Stores the note relationally, then indexes it. The relational commit is
	/// authoritative; an indexing failure is reported through `indexed`, never by
	/// rolling the note back.
	pub async fn create_note(
		&self,
		user_id: &str,
		req: CreateNoteRequest,
	) -> Result<CreateNoteResponse> {
		if req.text.trim().is_empty() {
			return Err(Error::InvalidRequest { message: "Note text must not be empty.".to_string() });
		}

		let now = OffsetDateTime::now_utc();
		let title = req
			.title
			.filter(|title| !title.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_TITLE.to_string());
		let note = Note {
			id: new_note_id(now),
			user_id: user_id.to_string(),
			title,
			text: req.text,
			created_at: now,
			updated_at: now,
		};
		let mut tx = self.db.begin().await?;

		queries::insert_note_tx(&mut tx, &note).await?;
		tx.commit().await.map_err(noterag_storage::Error::from)?;

		let indexed = match self.index_note(&note).await {
			Ok(()) => true,
			Err(err) => {
				tracing::error!(
					note_id = %note.id,
					user_id = %note.user_id,
					error = %err,
					"Vector indexing failed after relational commit; note needs reindexing."
				);

				false
			},
		};

		Ok(CreateNoteResponse { id: note.id, title: note.title, indexed })
	}

	pub async fn get_note(&self, user_id: &str, note_id: &str) -> Result<NoteView> {
		let note = queries::fetch_note(&self.db, user_id, note_id)
			.await?
			.ok_or_else(|| Error::NoteNotFound { note_id: note_id.to_string() })?;

		Ok(note.into())
	}

	pub async fn list_notes(&self, user_id: &str) -> Result<Vec<NoteView>> {
		let notes = queries::list_notes(&self.db, user_id).await?;

		Ok(notes.into_iter().map(NoteView::from).collect())
	}

	/// Deletes the relational row first, then clears vectors best-effort. A missing
	/// note is an error before anything is touched.
	pub async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<DeleteNoteResponse> {
		let mut tx = self.db.begin().await?;
		let removed = queries::delete_note_tx(&mut tx, user_id, note_id).await?;

		if !removed {
			return Err(Error::NoteNotFound { note_id: note_id.to_string() });
		}

		tx.commit().await.map_err(noterag_storage::Error::from)?;

		let vector_cleanup = match self.delete_vectors(user_id, note_id).await {
			Ok(()) => true,
			Err(err) => {
				tracing::error!(
					note_id = %note_id,
					user_id = %user_id,
					error = %err,
					"Vector cleanup failed after relational delete; stale points may remain."
				);

				false
			},
		};

		Ok(DeleteNoteResponse { id: note_id.to_string(), vector_cleanup })
	}

	async fn index_note(&self, note: &Note) -> Result<()> {
		let index = self.indexes.get_or_create(Some(&note.user_id)).await?;
		let meta = NoteMetadata {
			user_id: note.user_id.clone(),
			title: note.title.clone(),
			created_at: note.created_at,
		};

		index.upsert(&note.id, &note.text, &meta).await?;

		Ok(())
	}

	async fn delete_vectors(&self, user_id: &str, note_id: &str) -> Result<()> {
		let index = self.indexes.get_or_create(Some(user_id)).await?;

		index.delete(note_id).await?;

		Ok(())
	}
}

/// Note ids combine a millisecond timestamp with a random suffix, so ids sort
/// roughly by creation time while staying unique under concurrent writes.
fn new_note_id(now: OffsetDateTime) -> String {
	let millis = now.unix_timestamp_nanos() / 1_000_000;
	let suffix = Uuid::new_v4().simple().to_string();

	format!("note_{millis}_{}", &suffix[..8])
}
