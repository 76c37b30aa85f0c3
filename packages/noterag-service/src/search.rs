use std::collections::HashMap;

use serde::Serialize;
use time::OffsetDateTime;

use noterag_index::DocHit;
use noterag_storage::queries;

use crate::{Error, NoteService, Result};

#[derive(Clone, Debug, Serialize)]
pub struct SearchItem {
	pub id: String,
	pub title: String,
	pub text: String,
	pub score: f32,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

/// Vector hits plus the relational rows they resolved to, both in descending
/// similarity order. `hits` can be longer than `items` when stale vectors point at
/// deleted notes.
pub(crate) struct Retrieved {
	pub(crate) hits: Vec<DocHit>,
	pub(crate) items: Vec<SearchItem>,
}

impl NoteService {
	/// Semantic search over the user's notes. Results carry full note content and
	/// arrive in descending similarity order; an empty store yields an empty list.
	pub async fn search(
		&self,
		user_id: &str,
		query: &str,
		limit: Option<u32>,
	) -> Result<Vec<SearchItem>> {
		let retrieved = self.retrieve(user_id, query, limit).await?;

		Ok(retrieved.items)
	}

	pub(crate) async fn retrieve(
		&self,
		user_id: &str,
		query: &str,
		limit: Option<u32>,
	) -> Result<Retrieved> {
		if query.trim().is_empty() {
			return Err(Error::InvalidRequest {
				message: "Search query must not be empty.".to_string(),
			});
		}

		let limit = limit.unwrap_or(self.cfg.retrieval.search_limit);

		if limit == 0 {
			return Err(Error::InvalidRequest {
				message: "Search limit must be at least 1.".to_string(),
			});
		}

		let index = self.indexes.get_or_create(Some(user_id)).await?;
		let hits = index.query(query, limit).await?;

		if hits.is_empty() {
			return Ok(Retrieved { hits, items: Vec::new() });
		}

		let ids = hits.iter().map(|hit| hit.doc_id.clone()).collect::<Vec<_>>();
		let notes = queries::fetch_notes_by_ids(&self.db, user_id, &ids).await?;
		let mut by_id =
			notes.into_iter().map(|note| (note.id.clone(), note)).collect::<HashMap<_, _>>();
		let mut items = Vec::with_capacity(hits.len());

		// Rows come back in database order; similarity rank is the contract, so the
		// hit list drives the output.
		for hit in &hits {
			let Some(note) = by_id.remove(&hit.doc_id) else {
				tracing::warn!(
					note_id = %hit.doc_id,
					user_id = %user_id,
					"Search hit has no relational row; skipping stale vector."
				);

				continue;
			};

			items.push(SearchItem {
				id: note.id,
				title: note.title,
				text: note.text,
				score: hit.score,
				created_at: note.created_at,
			});
		}

		Ok(Retrieved { hits, items })
	}
}
