use serde::Serialize;

use crate::{NoteService, Result, search::SearchItem};

/// Returned when retrieval finds nothing; the LLM is never consulted.
pub const NO_CONTEXT_ANSWER: &str = "Could not find relevant notes to answer the question.";
/// Returned when vector hits exist but none resolve to a stored note.
pub const STALE_CONTEXT_ANSWER: &str =
	"Found potentially relevant note references, but could not retrieve their content.";
/// Returned when the completion call fails; the question itself was fine.
pub const FAILED_ANSWER: &str = "An error occurred while processing the query.";

#[derive(Debug, Serialize)]
pub struct AnswerSource {
	pub id: String,
	pub score: f32,
	pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
	pub answer: String,
	pub sources: Vec<AnswerSource>,
}

impl NoteService {
	/// Answers a question from the user's notes: retrieve, assemble context, one
	/// completion call. Degraded outcomes map to fixed answer strings rather than
	/// errors, so the endpoint always has something to say.
	pub async fn answer(
		&self,
		user_id: &str,
		question: &str,
		top_k: Option<u32>,
	) -> Result<AnswerResponse> {
		let top_k = top_k.unwrap_or(self.cfg.retrieval.answer_top_k);
		let retrieved = self.retrieve(user_id, question, Some(top_k)).await?;

		if retrieved.hits.is_empty() {
			return Ok(AnswerResponse {
				answer: NO_CONTEXT_ANSWER.to_string(),
				sources: Vec::new(),
			});
		}

		let sources = retrieved
			.hits
			.iter()
			.map(|hit| AnswerSource {
				id: hit.doc_id.clone(),
				score: hit.score,
				title: retrieved
					.items
					.iter()
					.find(|item| item.id == hit.doc_id)
					.map(|item| item.title.clone()),
			})
			.collect::<Vec<_>>();

		if retrieved.items.is_empty() {
			return Ok(AnswerResponse { answer: STALE_CONTEXT_ANSWER.to_string(), sources });
		}

		let context = build_context(&retrieved.items);
		let prompt = build_prompt(&context, question);

		match self.completion.complete(&self.cfg.providers.llm, &prompt).await {
			Ok(text) => Ok(AnswerResponse { answer: text.trim().to_string(), sources }),
			Err(err) => {
				tracing::error!(
					user_id = %user_id,
					error = %err,
					"Completion call failed; returning degraded answer."
				);

				Ok(AnswerResponse { answer: FAILED_ANSWER.to_string(), sources: Vec::new() })
			},
		}
	}
}

fn build_context(items: &[SearchItem]) -> String {
	items
		.iter()
		.map(|item| format!("---\nNote Title: {}\nNote Content: {}\n---", item.title, item.text))
		.collect::<Vec<_>>()
		.join("\n")
}

fn build_prompt(context: &str, question: &str) -> String {
	format!(
		"Based ONLY on the following context extracted from user notes, please answer the question.\n\
		If the context does not contain the answer, say so.\n\n\
		Context:\n{context}\n\n\
		Question: {question}\n\n\
		Answer:"
	)
}
