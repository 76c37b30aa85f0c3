use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	pub max_chars: usize,
	pub overlap_chars: usize,
}

#[derive(Clone, Debug)]
pub struct Chunk {
	pub chunk_index: i32,
	pub start_offset: usize,
	pub end_offset: usize,
	pub text: String,
}

/// Splits note text into sentence-bounded chunks under a character budget, carrying an
/// overlap tail from each chunk into the next. Whitespace-only input yields no chunks.
pub fn split_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	if text.trim().is_empty() {
		return Vec::new();
	}

	let sentences: Vec<(usize, &str)> = text.split_sentence_bound_indices().collect();
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut current_start = 0_usize;
	let mut last_end = 0_usize;
	let mut chunk_index = 0_i32;

	for (idx, sentence) in sentences {
		let candidate_chars = current.chars().count() + sentence.chars().count();

		if candidate_chars > cfg.max_chars && !current.is_empty() {
			chunks.push(Chunk {
				chunk_index,
				start_offset: current_start,
				end_offset: last_end,
				text: current.clone(),
			});

			chunk_index += 1;

			let overlap = overlap_tail(&current, cfg.overlap_chars);

			current_start = last_end.saturating_sub(overlap.len());
			current = overlap;
		}
		if current.is_empty() {
			current_start = idx;
		}

		current.push_str(sentence);

		last_end = idx + sentence.len();
	}

	if !current.trim().is_empty() {
		chunks.push(Chunk {
			chunk_index,
			start_offset: current_start,
			end_offset: last_end,
			text: current,
		});
	}

	chunks
}

fn overlap_tail(text: &str, overlap_chars: usize) -> String {
	if overlap_chars == 0 {
		return String::new();
	}

	let total = text.chars().count();
	let skip = total.saturating_sub(overlap_chars);

	text.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn cfg(max_chars: usize, overlap_chars: usize) -> ChunkingConfig {
		ChunkingConfig { max_chars, overlap_chars }
	}

	#[test]
	fn short_text_is_a_single_chunk() {
		let chunks = split_text("AI is cool", &cfg(512, 64));

		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].chunk_index, 0);
		assert_eq!(chunks[0].text, "AI is cool");
	}

	#[test]
	fn empty_and_whitespace_text_yield_no_chunks() {
		assert!(split_text("", &cfg(512, 64)).is_empty());
		assert!(split_text("   \n\t ", &cfg(512, 64)).is_empty());
	}

	#[test]
	fn long_text_splits_on_sentence_bounds_with_overlap() {
		let text = "One sentence here. Another sentence follows. A third one lands. Final.";
		let chunks = split_text(text, &cfg(40, 10));

		assert!(chunks.len() > 1);
		assert!(chunks[0].text.contains("One sentence"));

		// The overlap tail of each chunk reappears at the head of the next.
		for window in chunks.windows(2) {
			let tail: String = window[0].text.chars().rev().take(10).collect::<Vec<_>>().into_iter().rev().collect();

			assert!(window[1].text.starts_with(&tail));
		}
	}

	#[test]
	fn chunk_indexes_are_sequential() {
		let text = "Alpha beta gamma. Delta epsilon zeta. Eta theta iota. Kappa lambda mu.";
		let chunks = split_text(text, &cfg(30, 5));

		for (idx, chunk) in chunks.iter().enumerate() {
			assert_eq!(chunk.chunk_index, idx as i32);
		}
	}
}
