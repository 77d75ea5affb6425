use crate::text;

/// Canonical country name followed by the names and codes registries use for it.
const COUNTRIES: &[(&str, &[&str])] = &[
	(
		"united states",
		&["us", "usa", "u s", "u s a", "united states of america", "america"],
	),
	(
		"united kingdom",
		&["uk", "gb", "gbr", "great britain", "britain", "england", "scotland", "wales"],
	),
	("canada", &["ca", "can"]),
	("mexico", &["mx", "mex"]),
	("brazil", &["br", "bra", "brasil"]),
	("argentina", &["ar", "arg"]),
	("germany", &["de", "deu", "deutschland"]),
	("france", &["fr", "fra"]),
	("spain", &["es", "esp", "espana"]),
	("italy", &["it", "ita", "italia"]),
	("netherlands", &["nl", "nld", "the netherlands", "holland"]),
	("belgium", &["be", "bel"]),
	("switzerland", &["ch", "che"]),
	("austria", &["at", "aut"]),
	("sweden", &["se", "swe"]),
	("norway", &["no", "nor"]),
	("denmark", &["dk", "dnk"]),
	("finland", &["fi", "fin"]),
	("ireland", &["ie", "irl"]),
	("poland", &["pl", "pol"]),
	("czechia", &["cz", "cze", "czech republic"]),
	("hungary", &["hu", "hun"]),
	("greece", &["gr", "grc"]),
	("portugal", &["pt", "prt"]),
	("russia", &["ru", "rus", "russian federation"]),
	("turkey", &["tr", "tur", "turkiye"]),
	("israel", &["il", "isr"]),
	("egypt", &["eg", "egy"]),
	("south africa", &["za", "zaf"]),
	("india", &["in", "ind"]),
	("china", &["cn", "chn", "prc", "people s republic of china"]),
	("taiwan", &["tw", "twn"]),
	("hong kong", &["hk", "hkg"]),
	("japan", &["jp", "jpn"]),
	("south korea", &["kr", "kor", "korea", "republic of korea", "korea republic of"]),
	("singapore", &["sg", "sgp"]),
	("thailand", &["th", "tha"]),
	("vietnam", &["vn", "vnm", "viet nam"]),
	("australia", &["au", "aus"]),
	("new zealand", &["nz", "nzl"]),
];

/// Canonical name for a country string, or its normalized form when unknown.
pub fn country_key(raw: &str) -> String {
	let normalized = text::normalize_text(raw);

	for (canonical, aliases) in COUNTRIES {
		if *canonical == normalized || aliases.contains(&normalized.as_str()) {
			return (*canonical).to_string();
		}
	}

	normalized
}

pub fn countries_match(left: &str, right: &str) -> bool {
	let left = country_key(left);

	!left.is_empty() && left == country_key(right)
}
