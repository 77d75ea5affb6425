use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentence<'a> {
	pub index: usize,
	/// Byte offset of the trimmed sentence within the source text.
	pub start: usize,
	pub text: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Word<'a> {
	/// Ordinal of the word within its sentence.
	pub position: usize,
	pub start: usize,
	pub end: usize,
	pub text: &'a str,
}

/// NFKC, lower-case, punctuation folded to spaces, whitespace collapsed.
pub fn normalize_text(input: &str) -> String {
	let folded: String = input
		.nfkc()
		.flat_map(char::to_lowercase)
		.map(|ch| if ch.is_alphanumeric() { ch } else { ' ' })
		.collect();

	folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn split_sentences(text: &str) -> Vec<Sentence<'_>> {
	let mut sentences = Vec::new();

	for (offset, raw) in text.split_sentence_bound_indices() {
		let trimmed = raw.trim();

		if trimmed.is_empty() {
			continue;
		}

		// Criteria lists put one item per line without terminal punctuation.
		let mut line_offset = offset + (raw.len() - raw.trim_start().len());

		for line in trimmed.split('\n') {
			let line_text = line.trim();

			if !line_text.is_empty() {
				let lead = line.len() - line.trim_start().len();

				sentences.push(Sentence {
					index: sentences.len(),
					start: line_offset + lead,
					text: line_text,
				});
			}

			line_offset += line.len() + 1;
		}
	}

	sentences
}

pub fn words(text: &str) -> Vec<Word<'_>> {
	text.unicode_word_indices()
		.enumerate()
		.map(|(position, (start, word))| Word {
			position,
			start,
			end: start + word.len(),
			text: word,
		})
		.collect()
}

/// Cuts `text` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_string();
	}

	let keep = max_chars.saturating_sub(1);
	let mut out: String = text.chars().take(keep).collect();

	out.truncate(out.trim_end().len());
	out.push('…');

	out
}
