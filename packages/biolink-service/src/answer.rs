use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ActionOutcome, BioLinkService, ExecutedAction};
use biolink_domain::{Record, text};

/// Serialized step outcomes beyond this many characters are cut before prompting.
pub const MAX_OUTCOME_CHARS: usize = 12_000;
/// Records named per step in the plain summary.
pub const MAX_LISTED_RECORDS: usize = 3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinalAnswer {
	pub text: String,
	/// False when the plain summary stands in for a provider answer.
	pub synthesized: bool,
}

impl BioLinkService {
	/// One user-facing answer for the question and what each step returned.
	///
	/// The provider is asked once. A failure or an unusable reply falls back to a summary built
	/// from the outcomes alone.
	pub async fn answer(&self, question: &str, outcomes: &[ExecutedAction]) -> FinalAnswer {
		let messages = answer_messages(question, outcomes);
		let classifier = self.providers.classifier.as_ref();
		let reply = match classifier.classify(&self.cfg.providers.router, &messages).await {
			Ok(json) => parse_answer(&json),
			Err(err) => {
				tracing::warn!(error = %err, "Answer synthesis failed.");

				None
			},
		};

		match reply {
			Some(text) => FinalAnswer { text, synthesized: true },
			None => {
				tracing::info!(question, "Answer fell back to the outcome summary.");

				FinalAnswer { text: summarize_outcomes(question, outcomes), synthesized: false }
			},
		}
	}
}

fn answer_messages(question: &str, outcomes: &[ExecutedAction]) -> Vec<Value> {
	let system = "You are a biomedical research assistant. Read the user's question, the tools \
that ran, and what each returned. Start with a short answer of two to four sentences, then list \
key drugs, targets, trials, or limitations when they appear in the data. Use only information in \
the tool results and say so when the data is sparse. Write Markdown. Reply with JSON only, shaped \
as {\"answer\": \"<markdown>\"}.";
	let results = serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string());
	let user = format!(
		"User question:\n{question}\n\nTool results:\n{}",
		text::truncate_chars(&results, MAX_OUTCOME_CHARS)
	);

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

fn parse_answer(json: &Value) -> Option<String> {
	json.get("answer")
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|answer| !answer.is_empty())
		.map(str::to_string)
}

fn summarize_outcomes(question: &str, outcomes: &[ExecutedAction]) -> String {
	let mut lines = vec!["### Summary".to_string(), format!("Question: {question}"), String::new()];

	for executed in outcomes {
		lines.push(format!("- {}: {}", executed.tool, describe(&executed.outcome)));
	}

	if !outcomes.iter().any(|executed| has_data(&executed.outcome)) {
		lines.push(String::new());
		lines.push("Retrieved data is sparse for this question.".to_string());
	}

	lines.join("\n")
}

fn has_data(outcome: &ActionOutcome) -> bool {
	match outcome {
		ActionOutcome::Papers { records } | ActionOutcome::Trials { records } =>
			!records.is_empty(),
		ActionOutcome::Graph { report } => report.edge_count > 0,
		ActionOutcome::Match { report } => !report.results.is_empty(),
		ActionOutcome::DirectAnswer | ActionOutcome::Failed { .. } => false,
	}
}

fn describe(outcome: &ActionOutcome) -> String {
	match outcome {
		ActionOutcome::Papers { records } => listed("paper", records),
		ActionOutcome::Trials { records } => listed("trial", records),
		ActionOutcome::Graph { report } => format!(
			"graph {:?} holds {} nodes and {} edges",
			report.topic, report.node_count, report.edge_count
		),
		ActionOutcome::Match { report } => match report.results.first() {
			Some(best) => format!(
				"{} ranked trial(s), best {} ({}) at {:.2}",
				report.results.len(),
				best.record_id,
				best.title,
				best.score
			),
			None => "no eligible trials".to_string(),
		},
		ActionOutcome::DirectAnswer => "no retrieval needed".to_string(),
		ActionOutcome::Failed { message } => format!("failed: {message}"),
	}
}

fn listed(noun: &str, records: &[Record]) -> String {
	if records.is_empty() {
		return format!("no {noun}s found");
	}

	let named = records
		.iter()
		.take(MAX_LISTED_RECORDS)
		.map(|record| format!("{} ({})", record.title, record.id))
		.collect::<Vec<_>>()
		.join("; ");

	format!("{} {noun}(s): {named}", records.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ActionKind;
	use biolink_domain::Source;

	#[test]
	fn answer_needs_a_non_empty_string() {
		assert_eq!(
			parse_answer(&serde_json::json!({ "answer": " EGFR is a gene. " })),
			Some("EGFR is a gene.".to_string())
		);
		assert_eq!(parse_answer(&serde_json::json!({ "answer": "  " })), None);
		assert_eq!(parse_answer(&serde_json::json!({ "actions": ["search_trials"] })), None);
	}

	#[test]
	fn summary_names_records_and_failures() {
		let outcomes = vec![
			ExecutedAction {
				tool: ActionKind::SearchTrials,
				outcome: ActionOutcome::Trials {
					records: vec![Record::new("NCT-1", Source::Trial, "Osimertinib study", "")],
				},
			},
			ExecutedAction {
				tool: ActionKind::SearchLiterature,
				outcome: ActionOutcome::Failed { message: "PubMed timed out.".to_string() },
			},
		];
		let summary = summarize_outcomes("EGFR trials?", &outcomes);

		assert!(summary.contains("- search_trials: 1 trial(s): Osimertinib study (NCT-1)"));
		assert!(summary.contains("- search_literature: failed: PubMed timed out."));
		assert!(!summary.contains("sparse"));
	}

	#[test]
	fn empty_outcomes_are_called_sparse() {
		let outcomes = vec![ExecutedAction {
			tool: ActionKind::SearchLiterature,
			outcome: ActionOutcome::Papers { records: Vec::new() },
		}];
		let summary = summarize_outcomes("rare disease?", &outcomes);

		assert!(summary.contains("no papers found"));
		assert!(summary.contains("Retrieved data is sparse"));
	}
}
