use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

/// Well-known keys of [`Record::fields`].
pub mod fields {
	pub const AGE_MIN: &str = "age_min";
	pub const AGE_MAX: &str = "age_max";
	pub const SEX: &str = "sex";
	pub const COUNTRIES: &str = "countries";
	pub const CITIES: &str = "cities";
	pub const CONDITIONS: &str = "conditions";
	pub const PHASE: &str = "phase";
	pub const STATUS: &str = "status";
	pub const JOURNAL: &str = "journal";
	pub const YEAR: &str = "year";
	pub const URL: &str = "url";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
	Trial,
	Paper,
}
impl Source {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Trial => "trial",
			Self::Paper => "paper",
		}
	}
}

impl fmt::Display for Source {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
	Number(f64),
	Text(String),
	List(Vec<String>),
}
impl FieldValue {
	pub fn as_text(&self) -> Option<&str> {
		match self {
			Self::Text(text) => Some(text.as_str()),
			_ => None,
		}
	}
}

impl From<&str> for FieldValue {
	fn from(value: &str) -> Self {
		Self::Text(value.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}

impl From<f64> for FieldValue {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}

impl From<Vec<String>> for FieldValue {
	fn from(value: Vec<String>) -> Self {
		Self::List(value)
	}
}

/// A trial or paper as fetched from a registry. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
	pub id: String,
	pub source: Source,
	pub title: String,
	/// Eligibility criteria for trials, abstract for papers.
	pub body: String,
	#[serde(default)]
	pub fields: BTreeMap<String, FieldValue>,
}
impl Record {
	pub fn new(
		id: impl Into<String>,
		source: Source,
		title: impl Into<String>,
		body: impl Into<String>,
	) -> Self {
		Self {
			id: id.into(),
			source,
			title: title.into(),
			body: body.into(),
			fields: BTreeMap::new(),
		}
	}

	pub fn with_field(mut self, key: &str, value: impl Into<FieldValue>) -> Self {
		self.fields.insert(key.to_string(), value.into());

		self
	}

	pub fn field(&self, key: &str) -> Option<&FieldValue> {
		self.fields.get(key)
	}

	pub fn text_field(&self, key: &str) -> Option<&str> {
		self.field(key).and_then(FieldValue::as_text)
	}

	/// Text stored in the semantic index for this record.
	pub fn embedding_text(&self) -> String {
		format!("{}\n{}", self.title, self.body)
	}
}
