use std::collections::BTreeSet;

use serde_json::Value;

use crate::{Error, Result};
use biolink_domain::{Record, Source, fields};

/// Recruiting studies for a condition from the ClinicalTrials.gov v2 API.
pub async fn search(
	cfg: &biolink_config::TrialsRegistry,
	condition: &str,
	limit: u32,
) -> Result<Vec<Record>> {
	if limit == 0 || condition.trim().is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}/studies", cfg.api_base);
	let page_size = limit.min(cfg.max_page_size).to_string();
	let res = client
		.get(&url)
		.query(&[
			("query.cond", condition.trim()),
			("filter.overallStatus", "RECRUITING"),
			("pageSize", page_size.as_str()),
			("format", "json"),
		])
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let mut records = parse_studies(&json)?;

	records.truncate(limit as usize);

	tracing::debug!(condition, count = records.len(), "Fetched trials.");

	Ok(records)
}

pub fn parse_studies(json: &Value) -> Result<Vec<Record>> {
	let studies = json.get("studies").and_then(Value::as_array).ok_or_else(|| {
		Error::InvalidResponse { message: "Trials response is missing studies array.".to_string() }
	})?;

	Ok(studies.iter().filter_map(parse_study).collect())
}

fn parse_study(study: &Value) -> Option<Record> {
	let protocol = study.get("protocolSection")?;
	let identification = protocol.get("identificationModule");
	let nct_id = text_at(identification, "nctId").filter(|id| !id.is_empty())?;
	let title = text_at(identification, "briefTitle")
		.or_else(|| text_at(identification, "officialTitle"))
		.unwrap_or_else(|| nct_id.clone());
	let eligibility = protocol.get("eligibilityModule");
	let body = text_at(eligibility, "eligibilityCriteria")
		.or_else(|| text_at(protocol.get("descriptionModule"), "briefSummary"))
		.unwrap_or_default();
	let mut record = Record::new(nct_id.clone(), Source::Trial, title, body)
		.with_field(fields::URL, format!("https://clinicaltrials.gov/study/{nct_id}"));

	if let Some(age) = text_at(eligibility, "minimumAge") {
		record = record.with_field(fields::AGE_MIN, age);
	}
	if let Some(age) = text_at(eligibility, "maximumAge") {
		record = record.with_field(fields::AGE_MAX, age);
	}

	record = record.with_field(
		fields::SEX,
		text_at(eligibility, "sex").unwrap_or_else(|| "ALL".to_string()),
	);

	if let Some(locations) = protocol
		.get("contactsLocationsModule")
		.and_then(|module| module.get("locations"))
		.and_then(Value::as_array)
	{
		let mut countries = BTreeSet::new();
		let mut cities = BTreeSet::new();

		for location in locations {
			if let Some(country) = text_at(Some(location), "country") {
				countries.insert(country);
			}
			if let Some(city) = text_at(Some(location), "city") {
				cities.insert(city);
			}
		}

		record = record
			.with_field(fields::COUNTRIES, countries.into_iter().collect::<Vec<_>>())
			.with_field(fields::CITIES, cities.into_iter().collect::<Vec<_>>());
	}

	if let Some(status) = text_at(protocol.get("statusModule"), "overallStatus") {
		record = record.with_field(fields::STATUS, status);
	}

	let phases = strings_at(protocol.get("designModule"), "phases");

	if !phases.is_empty() {
		record = record.with_field(fields::PHASE, phases.join(", "));
	}

	let conditions = strings_at(protocol.get("conditionsModule"), "conditions");

	if !conditions.is_empty() {
		record = record.with_field(fields::CONDITIONS, conditions);
	}

	Some(record)
}

fn text_at(module: Option<&Value>, key: &str) -> Option<String> {
	module
		.and_then(|module| module.get(key))
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string)
}

fn strings_at(module: Option<&Value>, key: &str) -> Vec<String> {
	module
		.and_then(|module| module.get(key))
		.and_then(Value::as_array)
		.map(|items| {
			items
				.iter()
				.filter_map(Value::as_str)
				.map(str::trim)
				.filter(|text| !text.is_empty())
				.map(str::to_string)
				.collect()
		})
		.unwrap_or_default()
}
