use std::{
	collections::{HashMap, HashSet},
	fmt,
	str::FromStr,
	sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	canonical::{self, EntityKey, EntityType},
	lexicon,
	record::{Record, Source},
	text,
};

const MAX_PHRASE_WORDS: usize = 6;

static DRUG_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(
		r"^[a-z]{3,}(?:tinib|ciclib|parib|rafenib|lisib|zumab|ximab|mumab|umab|platin|taxel|tecan|gliptin|gliflozin|glutide)$",
	)
	.expect("Drug suffix pattern must compile.")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
	HasSubtype,
	Targets,
	Tests,
	MeasuredIn,
	Mentions,
	Treats,
}
impl RelationKind {
	pub const ALL: [Self; 6] = [
		Self::HasSubtype,
		Self::Targets,
		Self::Tests,
		Self::MeasuredIn,
		Self::Mentions,
		Self::Treats,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::HasSubtype => "HAS_SUBTYPE",
			Self::Targets => "TARGETS",
			Self::Tests => "TESTS",
			Self::MeasuredIn => "MEASURED_IN",
			Self::Mentions => "MENTIONS",
			Self::Treats => "TREATS",
		}
	}
}

impl fmt::Display for RelationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for RelationKind {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		Self::ALL.into_iter().find(|kind| kind.as_str() == raw.trim()).ok_or_else(|| {
			Error::Validation {
				message: format!("Relation type {raw:?} is not in the vocabulary."),
			}
		})
	}
}

/// A typed mention found inside one sentence.
#[derive(Clone, Debug, PartialEq)]
pub struct Span {
	pub entity_type: EntityType,
	pub surface: String,
	pub canonical: String,
	/// Byte range within the recognized text.
	pub start: usize,
	pub end: usize,
	/// Word ordinals, end exclusive.
	pub word_start: usize,
	pub word_end: usize,
}

pub trait Recognizer
where
	Self: Send + Sync,
{
	fn recognize(&self, sentence: &str) -> Vec<Span>;
}

/// Longest-match dictionary lookup over word n-grams plus drug-name suffix patterns.
pub struct LexiconRecognizer {
	phrases: HashMap<String, EntityType>,
	max_words: usize,
}
impl LexiconRecognizer {
	pub fn new() -> Self {
		let mut phrases = HashMap::new();

		for entity_type in EntityType::ALL {
			for phrase in lexicon::phrases(entity_type) {
				phrases.entry((*phrase).to_string()).or_insert(entity_type);
			}
			for (alias, _) in canonical::synonym_table(entity_type) {
				phrases.entry((*alias).to_string()).or_insert(entity_type);
			}
		}

		let max_words = phrases
			.keys()
			.map(|phrase| phrase.split(' ').count())
			.max()
			.unwrap_or(1)
			.min(MAX_PHRASE_WORDS);

		Self { phrases, max_words }
	}

	/// Adds custom vocabulary on top of the built-in lexicon.
	pub fn with_phrases<'a>(
		mut self,
		extra: impl IntoIterator<Item = (&'a str, EntityType)>,
	) -> Self {
		for (phrase, entity_type) in extra {
			let normalized = text::normalize_text(phrase);

			if normalized.is_empty() {
				continue;
			}

			self.max_words =
				self.max_words.max(normalized.split(' ').count()).min(MAX_PHRASE_WORDS);

			self.phrases.insert(normalized, entity_type);
		}

		self
	}

	fn lookup(&self, phrase: &str, surface: &str) -> Option<EntityType> {
		let entity_type = self.phrases.get(phrase).copied()?;

		if entity_type == EntityType::Gene
			&& lexicon::UPPERCASE_ONLY_GENES.contains(&phrase)
			&& surface.chars().any(char::is_lowercase)
		{
			return None;
		}

		Some(entity_type)
	}
}

impl Default for LexiconRecognizer {
	fn default() -> Self {
		Self::new()
	}
}

impl Recognizer for LexiconRecognizer {
	fn recognize(&self, sentence: &str) -> Vec<Span> {
		let tokens = tokenize(sentence);
		let mut spans = Vec::new();
		let mut idx = 0;

		while idx < tokens.len() {
			let mut matched = None;

			for len in (1..=self.max_words.min(tokens.len() - idx)).rev() {
				let window = &tokens[idx..idx + len];
				let phrase =
					window.iter().map(|token| token.text.as_str()).collect::<Vec<_>>().join(" ");
				let start = window[0].start;
				let end = window[len - 1].end;
				let surface = &sentence[start..end];

				if let Some(entity_type) = self.lookup(&phrase, surface)
					&& let Some(span) = build_span(entity_type, &phrase, surface, window)
				{
					matched = Some((span, len));

					break;
				}
			}

			if matched.is_none() {
				let token = &tokens[idx];

				if DRUG_SUFFIX.is_match(&token.text)
					&& let Some(span) = build_span(
						EntityType::Drug,
						&token.text,
						&sentence[token.start..token.end],
						std::slice::from_ref(token),
					) {
					matched = Some((span, 1));
				}
			}

			match matched {
				Some((span, len)) => {
					spans.push(span);

					idx += len;
				},
				None => idx += 1,
			}
		}

		spans
	}
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
	text: String,
	word: usize,
	start: usize,
	end: usize,
}

fn tokenize(sentence: &str) -> Vec<Token> {
	let mut tokens = Vec::new();

	for word in text::words(sentence) {
		for piece in text::normalize_text(word.text).split(' ').filter(|piece| !piece.is_empty()) {
			tokens.push(Token {
				text: piece.to_string(),
				word: word.position,
				start: word.start,
				end: word.end,
			});
		}
	}

	tokens
}

fn build_span(
	entity_type: EntityType,
	phrase: &str,
	surface: &str,
	window: &[Token],
) -> Option<Span> {
	if lexicon::is_banned(phrase) {
		return None;
	}

	let canonical = canonical::synonym_target(entity_type, phrase)
		.map(str::to_string)
		.unwrap_or_else(|| phrase.to_string());

	if entity_type != EntityType::Gene && canonical.chars().count() < lexicon::MIN_NAME_CHARS {
		return None;
	}

	let first = window.first()?;
	let last = window.last()?;

	Some(Span {
		entity_type,
		surface: surface.to_string(),
		canonical,
		start: first.start,
		end: last.end,
		word_start: first.word,
		word_end: last.word + 1,
	})
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
	pub key: EntityKey,
	/// Surface form as written in the source text.
	pub alias: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Evidence {
	pub record_id: Option<String>,
	pub sentence: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
	pub source: EntityKey,
	/// One of the `RelationKind` names; checked again when applied to a graph.
	pub relation: String,
	pub target: EntityKey,
	pub evidence: Evidence,
	pub confidence: f32,
	pub low_confidence: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
	pub entities: Vec<ExtractedEntity>,
	pub relations: Vec<ExtractedRelation>,
}
impl Extraction {
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty() && self.relations.is_empty()
	}

	pub fn extend(&mut self, other: Extraction) {
		self.entities.extend(other.entities);
		self.relations.extend(other.relations);
	}
}

#[derive(Clone)]
pub struct EntityExtractor {
	recognizer: Arc<dyn Recognizer>,
	proximity_window: usize,
}
impl EntityExtractor {
	pub fn new(proximity_window: usize) -> Self {
		Self::with_recognizer(Arc::new(LexiconRecognizer::new()), proximity_window)
	}

	pub fn with_recognizer(recognizer: Arc<dyn Recognizer>, proximity_window: usize) -> Self {
		Self { recognizer, proximity_window: proximity_window.max(1) }
	}

	pub fn recognize(&self, sentence: &str) -> Vec<Span> {
		self.recognizer.recognize(sentence)
	}

	pub fn extract(&self, text: &str) -> Extraction {
		self.extract_sentences(text, None).0
	}

	/// Extracts from title and body, adding the record node and its record-level relations.
	pub fn extract_record(&self, record: &Record) -> Extraction {
		let text = record.embedding_text();
		let (mut extraction, first_sentences) =
			self.extract_sentences(&text, Some(record.id.as_str()));
		let record_type = match record.source {
			Source::Trial => EntityType::Trial,
			Source::Paper => EntityType::Paper,
		};
		let record_key = EntityKey::new(record_type, record.id.trim());
		let mentioned: Vec<EntityKey> =
			extraction.entities.iter().map(|entity| entity.key.clone()).collect();
		let mut seen = HashSet::new();

		extraction.entities.insert(
			0,
			ExtractedEntity { key: record_key.clone(), alias: record.title.trim().to_string() },
		);

		for key in mentioned {
			if !seen.insert(key.clone()) {
				continue;
			}

			let kind = if record.source == Source::Trial && key.entity_type == EntityType::Drug {
				RelationKind::Tests
			} else {
				RelationKind::Mentions
			};
			let sentence = first_sentences.get(&key).cloned().unwrap_or_default();

			extraction.relations.push(ExtractedRelation {
				source: record_key.clone(),
				relation: kind.as_str().to_string(),
				target: key,
				evidence: Evidence { record_id: Some(record.id.clone()), sentence },
				confidence: 1.0,
				low_confidence: false,
			});
		}

		extraction
	}

	fn extract_sentences(
		&self,
		text: &str,
		record_id: Option<&str>,
	) -> (Extraction, HashMap<EntityKey, String>) {
		let mut extraction = Extraction::default();
		let mut seen_aliases = HashSet::new();
		let mut first_sentences = HashMap::new();

		for sentence in text::split_sentences(text) {
			let spans = self.recognizer.recognize(sentence.text);

			for span in &spans {
				let key = EntityKey::new(span.entity_type, span.canonical.clone());

				first_sentences.entry(key.clone()).or_insert_with(|| sentence.text.to_string());

				if seen_aliases.insert((key.clone(), span.surface.clone())) {
					extraction.entities.push(ExtractedEntity { key, alias: span.surface.clone() });
				}
			}

			let evidence = Evidence {
				record_id: record_id.map(str::to_string),
				sentence: sentence.text.to_string(),
			};

			extraction.relations.extend(self.sentence_relations(&spans, &evidence));
		}

		(extraction, first_sentences)
	}

	fn sentence_relations(&self, spans: &[Span], evidence: &Evidence) -> Vec<ExtractedRelation> {
		let mut best: Vec<(EntityKey, RelationKind, EntityKey, usize)> = Vec::new();

		for (i, left) in spans.iter().enumerate() {
			for right in &spans[i + 1..] {
				let Some((source, kind, target)) = classify_pair(left, right) else {
					continue;
				};
				let gap = right.word_start.saturating_sub(left.word_end);

				let existing =
					best.iter_mut().find(|(s, k, t, _)| *s == source && *k == kind && *t == target);

				match existing {
					Some(existing) => existing.3 = existing.3.min(gap),
					None => best.push((source, kind, target, gap)),
				}
			}
		}

		best.into_iter()
			.map(|(source, kind, target, gap)| ExtractedRelation {
				source,
				relation: kind.as_str().to_string(),
				target,
				evidence: evidence.clone(),
				confidence: proximity_confidence(gap, self.proximity_window),
				low_confidence: gap > self.proximity_window,
			})
			.collect()
	}
}

impl Default for EntityExtractor {
	fn default() -> Self {
		Self::new(12)
	}
}

fn classify_pair(left: &Span, right: &Span) -> Option<(EntityKey, RelationKind, EntityKey)> {
	use EntityType::*;

	let key = |span: &Span| EntityKey::new(span.entity_type, span.canonical.clone());

	if left.entity_type == right.entity_type && left.canonical == right.canonical {
		return None;
	}

	let (source, kind, target) = match (left.entity_type, right.entity_type) {
		(Drug, Disease) => (left, RelationKind::Treats, right),
		(Disease, Drug) => (right, RelationKind::Treats, left),
		(Drug, Gene | Biomarker) => (left, RelationKind::Targets, right),
		(Gene | Biomarker, Drug) => (right, RelationKind::Targets, left),
		(Biomarker | Outcome, Disease) => (left, RelationKind::MeasuredIn, right),
		(Disease, Biomarker | Outcome) => (right, RelationKind::MeasuredIn, left),
		(Disease, Disease) =>
			if lexicon::is_subtype(&left.canonical, &right.canonical) {
				(left, RelationKind::HasSubtype, right)
			} else if lexicon::is_subtype(&right.canonical, &left.canonical) {
				(right, RelationKind::HasSubtype, left)
			} else {
				return None;
			},
		_ => return None,
	};

	Some((key(source), kind, key(target)))
}

fn proximity_confidence(gap: usize, window: usize) -> f32 {
	let ratio = gap as f32 / (2 * window) as f32;

	(1.0 - ratio).clamp(0.1, 1.0)
}
