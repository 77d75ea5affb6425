use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{BioLinkService, ClassifierProvider, Error, Result};
use biolink_config::LlmProviderConfig;

pub const DEFAULT_MAX_RESULTS: u64 = 5;
pub const DEFAULT_TRIAL_LIMIT: u64 = 5;
pub const DEFAULT_MAX_PAPERS: u64 = 10;
pub const DEFAULT_MAX_TRIALS: u64 = 10;

/// Fixed menu, in the order the fallback decision lists it.
pub const ACTION_MENU: [ActionKind; 5] = [
	ActionKind::SearchLiterature,
	ActionKind::SearchTrials,
	ActionKind::BuildKnowledgeGraph,
	ActionKind::MatchPatient,
	ActionKind::AnswerDirectly,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
	SearchLiterature,
	SearchTrials,
	BuildKnowledgeGraph,
	MatchPatient,
	AnswerDirectly,
}
impl ActionKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SearchLiterature => "search_literature",
			Self::SearchTrials => "search_trials",
			Self::BuildKnowledgeGraph => "build_knowledge_graph",
			Self::MatchPatient => "match_patient",
			Self::AnswerDirectly => "answer_directly",
		}
	}

	fn description(self) -> &'static str {
		match self {
			Self::SearchLiterature =>
				"Search PubMed papers. Params: query (string), max_results (integer).",
			Self::SearchTrials =>
				"Search recruiting clinical trials. Params: condition (string), limit (integer), country (string, optional).",
			Self::BuildKnowledgeGraph =>
				"Build a knowledge graph for a topic. Params: topic (string), max_papers (integer), max_trials (integer), include_trials (boolean).",
			Self::MatchPatient =>
				"Match a patient description to trials. Params: condition (string), patient_note (string), age (integer, optional), sex (string, optional), country (string, optional).",
			Self::AnswerDirectly => "Answer from general knowledge without retrieval. No params.",
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ActionKind {
	type Err = Error;

	fn from_str(raw: &str) -> Result<Self> {
		ACTION_MENU.into_iter().find(|kind| kind.as_str() == raw.trim()).ok_or_else(|| {
			Error::Validation { message: format!("Unknown action {raw:?}.") }
		})
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
	pub tool: ActionKind,
	#[serde(default)]
	pub params: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
	pub question: String,
	/// Never empty.
	pub actions: Vec<Action>,
	pub direct_answer: bool,
	pub used_fallback: bool,
}
impl RoutingDecision {
	pub fn fallback(question: &str) -> Self {
		let actions = ACTION_MENU
			.into_iter()
			.map(|tool| Action { tool, params: complete_params(tool, Map::new(), question) })
			.collect();

		Self { question: question.to_string(), actions, direct_answer: false, used_fallback: true }
	}
}

/// Makes the single classification call for a question.
pub struct ToolRouter<'a> {
	provider: &'a dyn ClassifierProvider,
	cfg: &'a LlmProviderConfig,
}
impl<'a> ToolRouter<'a> {
	pub fn new(provider: &'a dyn ClassifierProvider, cfg: &'a LlmProviderConfig) -> Self {
		Self { provider, cfg }
	}

	pub async fn route(&self, question: &str) -> Result<RoutingDecision> {
		let question = question.trim();

		if question.is_empty() {
			return Err(Error::Validation { message: "question must be non-empty.".to_string() });
		}

		let messages = build_messages(question);
		let parsed = match self.provider.classify(self.cfg, &messages).await {
			Ok(json) => parse_actions(&json),
			Err(err) => {
				tracing::warn!(error = %err, "Router classification failed.");

				None
			},
		};
		let Some(chosen) = parsed else {
			tracing::info!(question, "Router fell back to every action.");

			return Ok(RoutingDecision::fallback(question));
		};
		let actions: Vec<Action> = chosen
			.into_iter()
			.map(|(tool, params)| Action { tool, params: complete_params(tool, params, question) })
			.collect();
		let direct_answer =
			actions.len() == 1 && actions[0].tool == ActionKind::AnswerDirectly;

		tracing::info!(
			question,
			actions = ?actions.iter().map(|action| action.tool.as_str()).collect::<Vec<_>>(),
			"Question routed."
		);

		Ok(RoutingDecision {
			question: question.to_string(),
			actions,
			direct_answer,
			used_fallback: false,
		})
	}
}

impl BioLinkService {
	pub async fn route_question(&self, question: &str) -> Result<RoutingDecision> {
		ToolRouter::new(self.providers.classifier.as_ref(), &self.cfg.providers.router)
			.route(question)
			.await
	}
}

fn build_messages(question: &str) -> Vec<Value> {
	let menu = ACTION_MENU
		.iter()
		.map(|kind| format!("- {}: {}", kind.as_str(), kind.description()))
		.collect::<Vec<_>>()
		.join("\n");
	let system = format!(
		"You route biomedical questions to retrieval tools. Choose one or more tools, in the order \
they should run, from this menu:\n{menu}\n\nReply with JSON only, shaped as \
{{\"actions\": [{{\"tool\": \"<name>\", \"params\": {{}}}}]}}. Choose answer_directly alone when \
no retrieval is needed."
	);

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": question }),
	]
}

/// Ordered, de-duplicated actions, or `None` when the reply cannot be trusted.
fn parse_actions(json: &Value) -> Option<Vec<(ActionKind, Map<String, Value>)>> {
	let items = json.get("actions").or_else(|| json.get("tools"))?.as_array()?;
	let mut seen = HashSet::new();
	let mut chosen = Vec::new();

	for item in items {
		let (name, params) = match item {
			Value::String(name) => (name.as_str(), Map::new()),
			Value::Object(object) => {
				let name = object.get("tool").or_else(|| object.get("name"))?.as_str()?;
				let params = object
					.get("params")
					.or_else(|| object.get("parameters"))
					.or_else(|| object.get("arguments"))
					.and_then(Value::as_object)
					.cloned()
					.unwrap_or_default();

				(name, params)
			},
			_ => return None,
		};
		let kind = ActionKind::from_str(name).ok()?;

		if seen.insert(kind) {
			chosen.push((kind, params));
		}
	}

	if chosen.is_empty() { None } else { Some(chosen) }
}

fn complete_params(
	kind: ActionKind,
	mut params: Map<String, Value>,
	question: &str,
) -> Map<String, Value> {
	match kind {
		ActionKind::SearchLiterature => {
			default_text(&mut params, "query", question);
			default_count(&mut params, "max_results", DEFAULT_MAX_RESULTS);
		},
		ActionKind::SearchTrials => {
			default_text(&mut params, "condition", question);
			default_count(&mut params, "limit", DEFAULT_TRIAL_LIMIT);
		},
		ActionKind::BuildKnowledgeGraph => {
			default_text(&mut params, "topic", question);
			default_count(&mut params, "max_papers", DEFAULT_MAX_PAPERS);
			default_count(&mut params, "max_trials", DEFAULT_MAX_TRIALS);

			if !params.get("include_trials").is_some_and(Value::is_boolean) {
				params.insert("include_trials".to_string(), Value::Bool(true));
			}
		},
		ActionKind::MatchPatient => {
			default_text(&mut params, "condition", question);
			default_text(&mut params, "patient_note", question);
		},
		ActionKind::AnswerDirectly => {},
	}

	params
}

fn default_text(params: &mut Map<String, Value>, key: &str, question: &str) {
	let present =
		params.get(key).and_then(Value::as_str).is_some_and(|text| !text.trim().is_empty());

	if !present {
		params.insert(key.to_string(), Value::String(question.to_string()));
	}
}

fn default_count(params: &mut Map<String, Value>, key: &str, default: u64) {
	if !params.get(key).and_then(Value::as_u64).is_some_and(|count| count > 0) {
		params.insert(key.to_string(), Value::from(default));
	}
}
