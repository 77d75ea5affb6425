use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, text};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
	Disease,
	Drug,
	Gene,
	Biomarker,
	Outcome,
	Trial,
	Paper,
}
impl EntityType {
	pub const ALL: [Self; 7] = [
		Self::Disease,
		Self::Drug,
		Self::Gene,
		Self::Biomarker,
		Self::Outcome,
		Self::Trial,
		Self::Paper,
	];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Disease => "Disease",
			Self::Drug => "Drug",
			Self::Gene => "Gene",
			Self::Biomarker => "Biomarker",
			Self::Outcome => "Outcome",
			Self::Trial => "Trial",
			Self::Paper => "Paper",
		}
	}

	/// Trial and Paper nodes stand for records, not concepts found in text.
	pub fn is_record(self) -> bool {
		matches!(self, Self::Trial | Self::Paper)
	}
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EntityType {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		Self::ALL
			.into_iter()
			.find(|entity_type| entity_type.as_str().eq_ignore_ascii_case(raw.trim()))
			.ok_or_else(|| Error::Validation { message: format!("Unknown entity type {raw:?}.") })
	}
}

/// Merge key of a graph node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
	pub entity_type: EntityType,
	pub name: String,
}
impl EntityKey {
	pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
		Self { entity_type, name: name.into() }
	}

	/// Key for a surface form, with the per-type synonym table applied.
	pub fn canonical(entity_type: EntityType, surface: &str) -> Self {
		Self { entity_type, name: canonical_name(entity_type, surface) }
	}
}

impl fmt::Display for EntityKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}", self.entity_type, self.name)
	}
}

/// Canonical name of a surface form. Record nodes keep their identifier verbatim.
pub fn canonical_name(entity_type: EntityType, surface: &str) -> String {
	if entity_type.is_record() {
		return surface.trim().to_string();
	}

	let normalized = text::normalize_text(surface);

	synonym_target(entity_type, &normalized).map(str::to_string).unwrap_or(normalized)
}

/// Canonical target of an already-normalized surface form, if the synonym table knows it.
pub fn synonym_target(entity_type: EntityType, normalized: &str) -> Option<&'static str> {
	synonym_table(entity_type)
		.iter()
		.find(|(alias, _)| *alias == normalized)
		.map(|(_, canonical)| *canonical)
}

pub(crate) fn synonym_table(entity_type: EntityType) -> &'static [(&'static str, &'static str)] {
	match entity_type {
		EntityType::Disease => DISEASE_SYNONYMS,
		EntityType::Drug => DRUG_SYNONYMS,
		EntityType::Gene => GENE_SYNONYMS,
		EntityType::Biomarker => BIOMARKER_SYNONYMS,
		EntityType::Outcome => OUTCOME_SYNONYMS,
		EntityType::Trial | EntityType::Paper => &[],
	}
}

const DISEASE_SYNONYMS: &[(&str, &str)] = &[
	("pulmonary malignancy", "lung cancer"),
	("pulmonary cancer", "lung cancer"),
	("lung carcinoma", "lung cancer"),
	("lung neoplasm", "lung cancer"),
	("lung neoplasms", "lung cancer"),
	("carcinoma of the lung", "lung cancer"),
	("nsclc", "non small cell lung cancer"),
	("non small cell lung carcinoma", "non small cell lung cancer"),
	("sclc", "small cell lung cancer"),
	("small cell lung carcinoma", "small cell lung cancer"),
	("breast carcinoma", "breast cancer"),
	("breast neoplasm", "breast cancer"),
	("breast neoplasms", "breast cancer"),
	("mammary carcinoma", "breast cancer"),
	("tnbc", "triple negative breast cancer"),
	("crc", "colorectal cancer"),
	("colorectal carcinoma", "colorectal cancer"),
	("colon cancer", "colorectal cancer"),
	("hcc", "hepatocellular carcinoma"),
	("liver cancer", "hepatocellular carcinoma"),
	("aml", "acute myeloid leukemia"),
	("cll", "chronic lymphocytic leukemia"),
	("prostate carcinoma", "prostate cancer"),
	("pancreatic carcinoma", "pancreatic cancer"),
	("pdac", "pancreatic ductal adenocarcinoma"),
	("t2d", "type 2 diabetes"),
	("t2dm", "type 2 diabetes"),
	("type 2 diabetes mellitus", "type 2 diabetes"),
	("type ii diabetes", "type 2 diabetes"),
	("t1d", "type 1 diabetes"),
	("type 1 diabetes mellitus", "type 1 diabetes"),
	("alzheimer s disease", "alzheimer disease"),
	("alzheimers disease", "alzheimer disease"),
	("parkinson s disease", "parkinson disease"),
	("parkinsons disease", "parkinson disease"),
	("copd", "chronic obstructive pulmonary disease"),
	("high blood pressure", "hypertension"),
];

const DRUG_SYNONYMS: &[(&str, &str)] = &[
	("tagrisso", "osimertinib"),
	("azd9291", "osimertinib"),
	("keytruda", "pembrolizumab"),
	("mk 3475", "pembrolizumab"),
	("opdivo", "nivolumab"),
	("tecentriq", "atezolizumab"),
	("imfinzi", "durvalumab"),
	("herceptin", "trastuzumab"),
	("perjeta", "pertuzumab"),
	("tarceva", "erlotinib"),
	("iressa", "gefitinib"),
	("gilotrif", "afatinib"),
	("gleevec", "imatinib"),
	("glivec", "imatinib"),
	("avastin", "bevacizumab"),
	("erbitux", "cetuximab"),
	("ibrance", "palbociclib"),
	("kisqali", "ribociclib"),
	("verzenio", "abemaciclib"),
	("lynparza", "olaparib"),
	("xalkori", "crizotinib"),
	("alecensa", "alectinib"),
	("lumakras", "sotorasib"),
	("glucophage", "metformin"),
	("ozempic", "semaglutide"),
	("wegovy", "semaglutide"),
	("jardiance", "empagliflozin"),
	("lantus", "insulin glargine"),
	("leqembi", "lecanemab"),
	("aduhelm", "aducanumab"),
	("humira", "adalimumab"),
];

const GENE_SYNONYMS: &[(&str, &str)] = &[
	("her2", "erbb2"),
	("her 2", "erbb2"),
	("her2 neu", "erbb2"),
	("her1", "egfr"),
	("erbb1", "egfr"),
	("p53", "tp53"),
	("k ras", "kras"),
	("b raf", "braf"),
	("alk fusion", "alk"),
	("c met", "met"),
];

const BIOMARKER_SYNONYMS: &[(&str, &str)] = &[
	("pd l1 expression", "pd l1"),
	("programmed death ligand 1", "pd l1"),
	("hemoglobin a1c", "hba1c"),
	("glycated hemoglobin", "hba1c"),
	("a1c", "hba1c"),
	("prostate specific antigen", "psa"),
	("carcinoembryonic antigen", "cea"),
	("tumor mutational burden", "tmb"),
	("circulating tumor dna", "ctdna"),
	("c reactive protein", "crp"),
	("ldl cholesterol", "ldl c"),
	("amyloid beta", "amyloid"),
];

const OUTCOME_SYNONYMS: &[(&str, &str)] = &[
	("os", "overall survival"),
	("pfs", "progression free survival"),
	("dfs", "disease free survival"),
	("orr", "objective response rate"),
	("objective response", "objective response rate"),
	("response rate", "objective response rate"),
	("dcr", "disease control rate"),
	("qol", "quality of life"),
	("mortality", "all cause mortality"),
	("hospitalisation", "hospitalization"),
];

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merges_disease_synonyms() {
		assert_eq!(canonical_name(EntityType::Disease, "Pulmonary Malignancy"), "lung cancer");
		assert_eq!(canonical_name(EntityType::Disease, "lung cancer"), "lung cancer");
		assert_eq!(canonical_name(EntityType::Disease, "NSCLC"), "non small cell lung cancer");
	}

	#[test]
	fn synonyms_are_scoped_per_type() {
		assert_eq!(canonical_name(EntityType::Drug, "Tagrisso"), "osimertinib");
		assert_eq!(canonical_name(EntityType::Gene, "HER2"), "erbb2");
		assert_eq!(canonical_name(EntityType::Disease, "HER2"), "her2");
	}

	#[test]
	fn unresolved_forms_stay_distinct() {
		assert_eq!(canonical_name(EntityType::Disease, "Rare Syndrome X"), "rare syndrome x");
	}

	#[test]
	fn record_names_are_kept_verbatim() {
		assert_eq!(canonical_name(EntityType::Trial, " NCT01234567 "), "NCT01234567");
	}

	#[test]
	fn parses_entity_type_case_insensitively() {
		assert_eq!("drug".parse::<EntityType>().expect("parse failed."), EntityType::Drug);
		assert!("protein".parse::<EntityType>().is_err());
	}
}
