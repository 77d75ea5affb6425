use quick_xml::{
	Reader,
	events::{BytesStart, Event},
};
use serde_json::Value;

use crate::{Error, Result};
use biolink_domain::{Record, Source, fields};

/// Papers for a topic via E-utilities: esearch for ids, then efetch for the articles.
pub async fn search(
	cfg: &biolink_config::PubmedRegistry,
	topic: &str,
	max_results: u32,
) -> Result<Vec<Record>> {
	if max_results == 0 || topic.trim().is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::client(cfg.timeout_ms)?;
	let retmax = max_results.to_string();
	let mut search_params = vec![
		("db", "pubmed"),
		("term", topic.trim()),
		("retmode", "json"),
		("retmax", retmax.as_str()),
		("tool", cfg.tool.as_str()),
	];

	if let Some(email) = cfg.email.as_deref() {
		search_params.push(("email", email));
	}

	let res = client
		.get(format!("{}/esearch.fcgi", cfg.api_base))
		.query(&search_params)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let ids = parse_search_ids(&json)?;

	if ids.is_empty() {
		return Ok(Vec::new());
	}

	let joined = ids.join(",");
	let mut fetch_params = vec![
		("db", "pubmed"),
		("id", joined.as_str()),
		("retmode", "xml"),
		("tool", cfg.tool.as_str()),
	];

	if let Some(email) = cfg.email.as_deref() {
		fetch_params.push(("email", email));
	}

	let xml = client
		.get(format!("{}/efetch.fcgi", cfg.api_base))
		.query(&fetch_params)
		.send()
		.await?
		.error_for_status()?
		.text()
		.await?;
	let records = parse_articles(&xml)?;

	tracing::debug!(topic, count = records.len(), "Fetched papers.");

	Ok(records)
}

pub fn parse_search_ids(json: &Value) -> Result<Vec<String>> {
	let ids = json
		.get("esearchresult")
		.and_then(|result| result.get("idlist"))
		.and_then(Value::as_array)
		.ok_or_else(|| Error::InvalidResponse {
			message: "PubMed search response is missing idlist.".to_string(),
		})?;

	Ok(ids.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

pub fn parse_articles(xml: &str) -> Result<Vec<Record>> {
	let mut reader = Reader::from_str(xml);
	let mut stack: Vec<Vec<u8>> = Vec::new();
	let mut draft: Option<ArticleDraft> = None;
	let mut capture: Option<Capture> = None;
	let mut records = Vec::new();

	loop {
		match reader.read_event()? {
			Event::Start(start) => {
				let name = start.local_name().as_ref().to_vec();

				if name == b"PubmedArticle" {
					draft = Some(ArticleDraft::default());
				} else if capture.is_none()
					&& let Some(current) = draft.as_ref()
					&& let Some(field) = capture_field(current, &start, stack.last())?
				{
					capture = Some(Capture { field, depth: stack.len() + 1, text: String::new() });
				}

				stack.push(name);
			},
			Event::Text(text) =>
				if let Some(capture) = capture.as_mut() {
					let decoded = text
						.unescape()
						.map(|value| value.into_owned())
						.unwrap_or_else(|_| String::from_utf8_lossy(&text).into_owned());

					capture.text.push_str(&decoded);
				},
			Event::CData(data) =>
				if let Some(capture) = capture.as_mut() {
					capture.text.push_str(&String::from_utf8_lossy(&data));
				},
			Event::End(_) => {
				if capture.as_ref().is_some_and(|capture| capture.depth == stack.len())
					&& let Some(done) = capture.take()
					&& let Some(current) = draft.as_mut()
				{
					current.apply(done);
				}

				let closed = stack.pop();

				if closed.as_deref() == Some(b"PubmedArticle".as_slice())
					&& let Some(record) = draft.take().and_then(ArticleDraft::into_record)
				{
					records.push(record);
				}
			},
			Event::Eof => break,
			_ => {},
		}
	}

	Ok(records)
}

#[derive(Default)]
struct ArticleDraft {
	pmid: Option<String>,
	title: Option<String>,
	sections: Vec<String>,
	journal: Option<String>,
	year: Option<f64>,
}
impl ArticleDraft {
	fn apply(&mut self, capture: Capture) {
		let text = collapse_whitespace(&capture.text);

		if text.is_empty() {
			return;
		}

		match capture.field {
			ArticleField::Pmid => self.pmid = Some(text),
			ArticleField::Title => self.title = Some(text),
			ArticleField::Section { label: Some(label) } =>
				self.sections.push(format!("{label}: {text}")),
			ArticleField::Section { label: None } => self.sections.push(text),
			ArticleField::Journal => self.journal = Some(text),
			ArticleField::Year => self.year = text.get(..4).and_then(|year| year.parse().ok()),
		}
	}

	fn into_record(self) -> Option<Record> {
		let pmid = self.pmid?;
		let url = format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/");
		let title = self.title.unwrap_or_default();
		let mut record = Record::new(pmid, Source::Paper, title, self.sections.join("\n"))
			.with_field(fields::URL, url);

		if let Some(journal) = self.journal {
			record = record.with_field(fields::JOURNAL, journal);
		}
		if let Some(year) = self.year {
			record = record.with_field(fields::YEAR, year);
		}

		Some(record)
	}
}

enum ArticleField {
	Pmid,
	Title,
	Section { label: Option<String> },
	Journal,
	// Either <Year> or the leading year of a <MedlineDate> such as "2021 Jan-Feb".
	Year,
}

struct Capture {
	field: ArticleField,
	depth: usize,
	text: String,
}

fn capture_field(
	draft: &ArticleDraft,
	start: &BytesStart<'_>,
	parent: Option<&Vec<u8>>,
) -> Result<Option<ArticleField>> {
	let parent = parent.map(Vec::as_slice).unwrap_or_default();
	let field = match start.local_name().as_ref() {
		// Comment corrections carry their own PMIDs deeper in the citation.
		b"PMID" if parent == b"MedlineCitation" && draft.pmid.is_none() => ArticleField::Pmid,
		b"ArticleTitle" if draft.title.is_none() => ArticleField::Title,
		b"AbstractText" => {
			let label = match start.try_get_attribute("Label").map_err(quick_xml::Error::from)? {
				Some(attr) => Some(attr.unescape_value()?.trim().to_string()),
				None => None,
			};

			ArticleField::Section { label: label.filter(|label| !label.is_empty()) }
		},
		b"Title" if parent == b"Journal" && draft.journal.is_none() => ArticleField::Journal,
		b"Year" | b"MedlineDate" if parent == b"PubDate" && draft.year.is_none() =>
			ArticleField::Year,
		_ => return Ok(None),
	};

	Ok(Some(field))
}

fn collapse_whitespace(raw: &str) -> String {
	raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
