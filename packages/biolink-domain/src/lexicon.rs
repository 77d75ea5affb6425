//! Built-in biomedical vocabulary. Every entry is stored in normalized form.

use crate::canonical::EntityType;

pub const MIN_NAME_CHARS: usize = 3;

/// Generic research words that never name an entity on their own.
pub const BANNED_WORDS: &[&str] = &[
	"study",
	"group",
	"data",
	"analysis",
	"results",
	"using",
	"between",
	"associated",
	"clinical",
	"patient",
	"patients",
	"year",
	"years",
	"time",
	"high",
	"during",
	"after",
	"before",
	"treatment",
	"control",
	"placebo",
];

/// Gene symbols that are also English words only count when written in capitals.
pub const UPPERCASE_ONLY_GENES: &[&str] = &["met", "ret", "kit", "ar"];

/// Parent disease first, subtype second.
pub const DISEASE_SUBTYPES: &[(&str, &str)] = &[
	("lung cancer", "non small cell lung cancer"),
	("lung cancer", "small cell lung cancer"),
	("non small cell lung cancer", "lung adenocarcinoma"),
	("non small cell lung cancer", "squamous cell lung carcinoma"),
	("breast cancer", "triple negative breast cancer"),
	("breast cancer", "her2 positive breast cancer"),
	("colorectal cancer", "metastatic colorectal cancer"),
	("pancreatic cancer", "pancreatic ductal adenocarcinoma"),
	("leukemia", "acute myeloid leukemia"),
	("leukemia", "chronic lymphocytic leukemia"),
	("lymphoma", "diffuse large b cell lymphoma"),
	("diabetes", "type 1 diabetes"),
	("diabetes", "type 2 diabetes"),
	("dementia", "alzheimer disease"),
];

pub const DISEASES: &[&str] = &[
	"lung cancer",
	"non small cell lung cancer",
	"small cell lung cancer",
	"lung adenocarcinoma",
	"squamous cell lung carcinoma",
	"breast cancer",
	"triple negative breast cancer",
	"her2 positive breast cancer",
	"colorectal cancer",
	"metastatic colorectal cancer",
	"hepatocellular carcinoma",
	"pancreatic cancer",
	"pancreatic ductal adenocarcinoma",
	"prostate cancer",
	"ovarian cancer",
	"gastric cancer",
	"bladder cancer",
	"melanoma",
	"glioblastoma",
	"leukemia",
	"acute myeloid leukemia",
	"chronic lymphocytic leukemia",
	"lymphoma",
	"diffuse large b cell lymphoma",
	"multiple myeloma",
	"brain metastases",
	"diabetes",
	"type 1 diabetes",
	"type 2 diabetes",
	"obesity",
	"hypertension",
	"heart failure",
	"atrial fibrillation",
	"chronic kidney disease",
	"asthma",
	"chronic obstructive pulmonary disease",
	"alzheimer disease",
	"dementia",
	"parkinson disease",
	"multiple sclerosis",
	"rheumatoid arthritis",
	"psoriasis",
	"crohn disease",
	"ulcerative colitis",
	"major depressive disorder",
	"schizophrenia",
	"covid 19",
	"hiv infection",
	"hepatitis b",
	"hepatitis c",
	"tuberculosis",
	"stroke",
];

pub const DRUGS: &[&str] = &[
	"osimertinib",
	"erlotinib",
	"gefitinib",
	"afatinib",
	"pembrolizumab",
	"nivolumab",
	"atezolizumab",
	"durvalumab",
	"ipilimumab",
	"trastuzumab",
	"pertuzumab",
	"bevacizumab",
	"cetuximab",
	"imatinib",
	"palbociclib",
	"ribociclib",
	"abemaciclib",
	"olaparib",
	"crizotinib",
	"alectinib",
	"lorlatinib",
	"sotorasib",
	"dabrafenib",
	"trametinib",
	"vemurafenib",
	"cisplatin",
	"carboplatin",
	"paclitaxel",
	"docetaxel",
	"pemetrexed",
	"gemcitabine",
	"doxorubicin",
	"cyclophosphamide",
	"capecitabine",
	"tamoxifen",
	"letrozole",
	"anastrozole",
	"metformin",
	"insulin",
	"insulin glargine",
	"semaglutide",
	"liraglutide",
	"empagliflozin",
	"dapagliflozin",
	"sitagliptin",
	"atorvastatin",
	"aspirin",
	"warfarin",
	"apixaban",
	"lecanemab",
	"aducanumab",
	"donepezil",
	"levodopa",
	"adalimumab",
	"methotrexate",
	"remdesivir",
	"dexamethasone",
];

pub const GENES: &[&str] = &[
	"egfr", "erbb2", "kras", "braf", "alk", "ros1", "met", "ret", "kit", "ntrk1", "tp53", "brca1",
	"brca2", "pik3ca", "pten", "cdk4", "cdk6", "esr1", "ar", "idh1", "idh2", "flt3", "npm1", "jak2",
	"apoe", "vegfa", "fgfr2", "fgfr3", "nras", "stk11", "keap1", "pdgfra", "pdcd1", "cd274",
	"ctla4",
];

pub const BIOMARKERS: &[&str] = &[
	"pd l1",
	"hba1c",
	"psa",
	"cea",
	"ca 125",
	"tmb",
	"ctdna",
	"ki 67",
	"crp",
	"ldl c",
	"troponin",
	"nt probnp",
	"amyloid",
	"tau",
	"estrogen receptor",
	"progesterone receptor",
	"microsatellite instability",
	"blood glucose",
	"body mass index",
	"creatinine",
];

pub const OUTCOMES: &[&str] = &[
	"overall survival",
	"progression free survival",
	"disease free survival",
	"event free survival",
	"objective response rate",
	"disease control rate",
	"complete response",
	"time to progression",
	"quality of life",
	"all cause mortality",
	"hospitalization",
	"adverse events",
	"toxicity",
	"weight loss",
	"remission",
];

pub fn phrases(entity_type: EntityType) -> &'static [&'static str] {
	match entity_type {
		EntityType::Disease => DISEASES,
		EntityType::Drug => DRUGS,
		EntityType::Gene => GENES,
		EntityType::Biomarker => BIOMARKERS,
		EntityType::Outcome => OUTCOMES,
		EntityType::Trial | EntityType::Paper => &[],
	}
}

pub fn is_banned(normalized: &str) -> bool {
	BANNED_WORDS.contains(&normalized)
}

pub fn is_subtype(parent: &str, child: &str) -> bool {
	DISEASE_SUBTYPES.iter().any(|(p, c)| *p == parent && *c == child)
}
