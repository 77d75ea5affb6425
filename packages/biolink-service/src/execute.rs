use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
	Action, ActionKind, BioLinkService, Error, FinalAnswer, GraphBuildOverrides, GraphBuildReport,
	MatchReport, Result, RoutingDecision,
	router::{DEFAULT_MAX_RESULTS, DEFAULT_TRIAL_LIMIT},
};
use biolink_domain::{FieldValue, PatientQuery, Record, country, fields};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionOutcome {
	Papers { records: Vec<Record> },
	Trials { records: Vec<Record> },
	Graph { report: Box<GraphBuildReport> },
	Match { report: MatchReport },
	/// Nothing to retrieve; the answer comes from the question alone.
	DirectAnswer,
	Failed { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
	pub tool: ActionKind,
	pub outcome: ActionOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
	pub decision: RoutingDecision,
	pub outcomes: Vec<ExecutedAction>,
	pub answer: FinalAnswer,
}

impl BioLinkService {
	/// Runs every action in order. A failing action is reported and the rest still run.
	pub async fn execute(&self, decision: &RoutingDecision) -> Vec<ExecutedAction> {
		let mut outcomes = Vec::with_capacity(decision.actions.len());

		for action in &decision.actions {
			let outcome = match self.run_action(action).await {
				Ok(outcome) => outcome,
				Err(err) => {
					tracing::warn!(tool = %action.tool, error = %err, "Routed action failed.");

					ActionOutcome::Failed { message: err.to_string() }
				},
			};

			outcomes.push(ExecutedAction { tool: action.tool, outcome });
		}

		outcomes
	}

	pub async fn route_and_execute(&self, question: &str) -> Result<ExecutionReport> {
		let decision = self.route_question(question).await?;
		let outcomes = self.execute(&decision).await;
		let answer = self.answer(&decision.question, &outcomes).await;

		Ok(ExecutionReport { decision, outcomes, answer })
	}

	async fn run_action(&self, action: &Action) -> Result<ActionOutcome> {
		let params = &action.params;

		match action.tool {
			ActionKind::SearchLiterature => {
				let query = required_text(params, "query")?;
				let max_results = count_param(params, "max_results")?
					.unwrap_or(DEFAULT_MAX_RESULTS as u32);
				let records = self
					.providers
					.records
					.fetch_papers(&self.cfg.registries.pubmed, &query, max_results)
					.await?;

				Ok(ActionOutcome::Papers { records })
			},
			ActionKind::SearchTrials => {
				let condition = required_text(params, "condition")?;
				let limit = count_param(params, "limit")?.unwrap_or(DEFAULT_TRIAL_LIMIT as u32);
				let mut records = self
					.providers
					.records
					.fetch_trials(&self.cfg.registries.trials, &condition, limit)
					.await?;

				if let Some(country) = optional_text(params, "country") {
					records.retain(|record| in_country(record, &country));
				}

				Ok(ActionOutcome::Trials { records })
			},
			ActionKind::BuildKnowledgeGraph => {
				let topic = required_text(params, "topic")?;
				let overrides = GraphBuildOverrides {
					max_papers: count_param(params, "max_papers")?,
					max_trials: count_param(params, "max_trials")?,
					include_trials: params.get("include_trials").and_then(Value::as_bool),
				};
				let report = self.build_graph(&topic, &overrides).await?;

				Ok(ActionOutcome::Graph { report: Box::new(report) })
			},
			ActionKind::MatchPatient => {
				let patient = PatientQuery {
					condition: optional_text(params, "condition").unwrap_or_default(),
					note: optional_text(params, "patient_note").unwrap_or_default(),
					age: count_param(params, "age")?,
					sex: optional_text(params, "sex"),
					country: optional_text(params, "country"),
				};
				let report = self.match_trials(&patient, count_param(params, "top_k")?).await?;

				Ok(ActionOutcome::Match { report })
			},
			ActionKind::AnswerDirectly => Ok(ActionOutcome::DirectAnswer),
		}
	}
}

/// Trials without a location list stay in; listed trials need a matching country.
fn in_country(record: &Record, country: &str) -> bool {
	match record.field(fields::COUNTRIES) {
		None => true,
		Some(FieldValue::List(countries)) =>
			countries.is_empty()
				|| countries.iter().any(|entry| country::countries_match(entry, country)),
		Some(FieldValue::Text(raw)) =>
			raw.trim().is_empty() || country::countries_match(raw, country),
		Some(FieldValue::Number(_)) => true,
	}
}

fn optional_text(params: &Map<String, Value>, key: &str) -> Option<String> {
	params
		.get(key)
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|text| !text.is_empty())
		.map(str::to_string)
}

fn required_text(params: &Map<String, Value>, key: &str) -> Result<String> {
	optional_text(params, key)
		.ok_or_else(|| Error::Validation { message: format!("{key} must be non-empty.") })
}

fn count_param(params: &Map<String, Value>, key: &str) -> Result<Option<u32>> {
	let Some(value) = params.get(key).filter(|value| !value.is_null()) else {
		return Ok(None);
	};
	let count = value
		.as_u64()
		.and_then(|count| u32::try_from(count).ok())
		.ok_or_else(|| Error::Validation {
			message: format!("{key} must be a non-negative integer."),
		})?;

	Ok(Some(count))
}
