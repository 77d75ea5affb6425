use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result, country,
	record::{FieldValue, Record, fields},
	text,
};

pub const MAX_PATIENT_AGE: u32 = 150;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
	#[default]
	Pass,
	Fail,
	Unknown,
}
impl Verdict {
	/// Unknown admits the record; only an explicit mismatch rejects it.
	pub fn admits(self) -> bool {
		self != Self::Fail
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
	Age,
	Sex,
	Location,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdicts {
	pub age: Verdict,
	pub sex: Verdict,
	pub location: Verdict,
}
impl Verdicts {
	pub fn iter(&self) -> impl Iterator<Item = (Dimension, Verdict)> {
		[
			(Dimension::Age, self.age),
			(Dimension::Sex, self.sex),
			(Dimension::Location, self.location),
		]
		.into_iter()
	}

	pub fn admits(&self) -> bool {
		self.iter().all(|(_, verdict)| verdict.admits())
	}

	pub fn unknown_count(&self) -> usize {
		self.iter().filter(|(_, verdict)| *verdict == Verdict::Unknown).count()
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
	Male,
	Female,
	All,
}

/// Maps the spellings registries and users use onto [`Sex`].
pub fn normalize_sex(raw: &str) -> Option<Sex> {
	match text::normalize_text(raw).as_str() {
		"m" | "male" | "males" | "man" | "men" => Some(Sex::Male),
		"f" | "female" | "females" | "woman" | "women" => Some(Sex::Female),
		"all" | "any" | "both" | "male and female" | "men and women" => Some(Sex::All),
		_ => None,
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AgeBound {
	Years(f64),
	Unbounded,
	Unparseable,
}

/// Parses registry ages such as `"18 Years"`, `"6 Months"` or `"N/A"` into years.
pub fn parse_age_bound(value: &FieldValue) -> AgeBound {
	match value {
		FieldValue::Number(years) if years.is_finite() && *years >= 0.0 => AgeBound::Years(*years),
		FieldValue::Number(_) | FieldValue::List(_) => AgeBound::Unparseable,
		FieldValue::Text(raw) => parse_age_text(raw),
	}
}

fn parse_age_text(raw: &str) -> AgeBound {
	let normalized = text::normalize_text(raw);

	if matches!(normalized.as_str(), "" | "n a" | "na" | "none" | "no limit") {
		return AgeBound::Unbounded;
	}

	let mut parts = normalized.split(' ');
	let Some(Ok(amount)) = parts.next().map(str::parse::<f64>) else {
		return AgeBound::Unparseable;
	};
	let divisor = match parts.next() {
		None | Some("year" | "years" | "yr" | "yrs") => 1.0,
		Some("month" | "months") => 12.0,
		Some("week" | "weeks") => 52.0,
		Some("day" | "days") => 365.0,
		Some("hour" | "hours" | "minute" | "minutes") => return AgeBound::Years(0.0),
		Some(_) => return AgeBound::Unparseable,
	};

	AgeBound::Years(amount / divisor)
}

/// Free-text patient description plus optional hard constraints.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientQuery {
	#[serde(default)]
	pub condition: String,
	#[serde(default, alias = "patient_note")]
	pub note: String,
	pub age: Option<u32>,
	pub sex: Option<String>,
	pub country: Option<String>,
}
impl PatientQuery {
	pub fn profile(&self) -> Result<PatientProfile> {
		if self.condition.trim().is_empty() && self.note.trim().is_empty() {
			return Err(Error::Validation {
				message: "condition or patient_note must be non-empty.".to_string(),
			});
		}

		if let Some(age) = self.age
			&& age > MAX_PATIENT_AGE
		{
			return Err(Error::Validation {
				message: format!("age must be at most {MAX_PATIENT_AGE}."),
			});
		}

		// "all" states no constraint, so it behaves like an absent sex.
		let sex = match self.sex.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
			None => None,
			Some(raw) => match normalize_sex(raw) {
				Some(Sex::All) => None,
				Some(sex) => Some(sex),
				None =>
					return Err(Error::Validation {
						message: format!("sex must be male, female, or all, got {raw:?}."),
					}),
			},
		};
		let country = self
			.country
			.as_deref()
			.map(str::trim)
			.filter(|raw| !raw.is_empty())
			.map(str::to_string);

		Ok(PatientProfile { age: self.age, sex, country })
	}

	/// Text the semantic index is queried with.
	pub fn query_text(&self) -> String {
		match (self.condition.trim(), self.note.trim()) {
			(condition, "") => condition.to_string(),
			("", note) => note.to_string(),
			(condition, note) => format!("{condition}\n{note}"),
		}
	}
}

/// Validated hard constraints of a patient.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatientProfile {
	pub age: Option<u32>,
	pub sex: Option<Sex>,
	pub country: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterOutcome {
	/// Ids of admitted records, in input order.
	pub passing: Vec<String>,
	pub verdicts: HashMap<String, Verdicts>,
	/// Records rejected per failing dimension.
	pub dropped: BTreeMap<Dimension, usize>,
	pub duplicates: usize,
}
impl FilterOutcome {
	pub fn is_passing(&self, record_id: &str) -> bool {
		self.verdicts.get(record_id).is_some_and(Verdicts::admits)
	}
}

/// Applies the hard constraints. Repeated record ids keep their first occurrence.
pub fn filter(records: &[Record], patient: &PatientProfile) -> FilterOutcome {
	let mut outcome = FilterOutcome::default();
	let mut seen = HashSet::new();

	for record in records {
		if !seen.insert(record.id.as_str()) {
			outcome.duplicates += 1;

			continue;
		}

		let verdicts = evaluate(record, patient);

		if verdicts.admits() {
			outcome.passing.push(record.id.clone());
		} else {
			for (dimension, verdict) in verdicts.iter() {
				if verdict == Verdict::Fail {
					*outcome.dropped.entry(dimension).or_default() += 1;
				}
			}
		}

		outcome.verdicts.insert(record.id.clone(), verdicts);
	}

	outcome
}

pub fn evaluate(record: &Record, patient: &PatientProfile) -> Verdicts {
	Verdicts {
		age: age_verdict(record, patient.age),
		sex: sex_verdict(record, patient.sex),
		location: location_verdict(record, patient.country.as_deref()),
	}
}

fn age_verdict(record: &Record, age: Option<u32>) -> Verdict {
	let Some(age) = age else {
		return Verdict::Pass;
	};
	let min = record.field(fields::AGE_MIN).map(parse_age_bound);
	let max = record.field(fields::AGE_MAX).map(parse_age_bound);

	if min.is_none() && max.is_none() {
		return Verdict::Unknown;
	}

	let age = f64::from(age);

	if let Some(AgeBound::Years(limit)) = min
		&& age < limit
	{
		return Verdict::Fail;
	}
	if let Some(AgeBound::Years(limit)) = max
		&& age > limit
	{
		return Verdict::Fail;
	}

	if [min, max].iter().any(|bound| matches!(bound, Some(AgeBound::Unparseable))) {
		Verdict::Unknown
	} else {
		Verdict::Pass
	}
}

fn sex_verdict(record: &Record, sex: Option<Sex>) -> Verdict {
	let Some(sex) = sex else {
		return Verdict::Pass;
	};
	let Some(value) = record.field(fields::SEX) else {
		return Verdict::Unknown;
	};
	let Some(raw) = value.as_text() else {
		return Verdict::Unknown;
	};

	if matches!(text::normalize_text(raw).as_str(), "" | "n a" | "na") {
		return Verdict::Pass;
	}

	match normalize_sex(raw) {
		Some(Sex::All) => Verdict::Pass,
		Some(required) if required == sex => Verdict::Pass,
		Some(_) => Verdict::Fail,
		None => Verdict::Unknown,
	}
}

fn location_verdict(record: &Record, country: Option<&str>) -> Verdict {
	let Some(country) = country else {
		return Verdict::Pass;
	};
	let locations: Vec<&str> = match record.field(fields::COUNTRIES) {
		None | Some(FieldValue::Number(_)) => return Verdict::Unknown,
		Some(FieldValue::List(items)) => items.iter().map(String::as_str).collect(),
		Some(FieldValue::Text(raw)) => raw.split([';', '|', '\n']).collect(),
	};
	let locations: Vec<&str> =
		locations.into_iter().map(str::trim).filter(|location| !location.is_empty()).collect();

	if locations.is_empty() {
		return Verdict::Pass;
	}

	if locations.iter().any(|location| country::countries_match(country, location)) {
		Verdict::Pass
	} else {
		Verdict::Fail
	}
}
