use std::sync::{Arc, atomic::Ordering};

use biolink_service::{ACTION_MENU, ActionKind, Error};
use biolink_testkit::{FailingClassifier, StaticClassifier};

#[tokio::test]
async fn provider_failure_falls_back_to_every_action() {
	let classifier = Arc::new(FailingClassifier::new());
	let calls = classifier.calls.clone();
	let service = super::service_with(classifier, Vec::new(), Vec::new());
	let decision =
		service.route_question("Which trials test osimertinib?").await.expect("route failed.");
	let tools: Vec<ActionKind> = decision.actions.iter().map(|action| action.tool).collect();

	assert_eq!(tools, ACTION_MENU.to_vec());
	assert!(decision.used_fallback);
	assert!(!decision.direct_answer);
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_and_empty_replies_fall_back() {
	for reply in [
		serde_json::json!({ "actions": [] }),
		serde_json::json!({ "actions": ["search_everything"] }),
		serde_json::json!("search_trials"),
		serde_json::json!({ "actions": [{ "params": {} }] }),
	] {
		let service =
			super::service_with(Arc::new(StaticClassifier::new(reply)), Vec::new(), Vec::new());
		let decision = service.route_question("EGFR papers").await.expect("route failed.");

		assert_eq!(decision.actions.len(), ACTION_MENU.len());
		assert!(decision.used_fallback);
	}
}

#[tokio::test]
async fn chosen_actions_get_defaults_from_the_question() {
	let classifier = StaticClassifier::new(serde_json::json!({
		"actions": [
			{ "tool": "search_literature", "params": { "max_results": 3 } },
			{ "tool": "build_knowledge_graph" }
		]
	}));
	let service = super::service_with(Arc::new(classifier), Vec::new(), Vec::new());
	let decision = service
		.route_question("  How does osimertinib act on EGFR?  ")
		.await
		.expect("route failed.");

	assert!(!decision.used_fallback);
	assert_eq!(decision.question, "How does osimertinib act on EGFR?");
	assert_eq!(decision.actions.len(), 2);
	assert_eq!(decision.actions[0].params["query"], "How does osimertinib act on EGFR?");
	assert_eq!(decision.actions[0].params["max_results"], 3);
	assert_eq!(decision.actions[1].params["topic"], "How does osimertinib act on EGFR?");
	assert_eq!(decision.actions[1].params["max_papers"], 10);
	assert_eq!(decision.actions[1].params["max_trials"], 10);
	assert_eq!(decision.actions[1].params["include_trials"], true);
}

#[tokio::test]
async fn answer_directly_alone_sets_the_direct_flag() {
	let service = super::service_with(
		Arc::new(StaticClassifier::actions(&["answer_directly"])),
		Vec::new(),
		Vec::new(),
	);
	let decision =
		service.route_question("What does EGFR stand for?").await.expect("route failed.");

	assert!(decision.direct_answer);
	assert_eq!(decision.actions.len(), 1);
}

#[tokio::test]
async fn blank_questions_are_rejected_without_a_call() {
	let classifier = Arc::new(FailingClassifier::new());
	let calls = classifier.calls.clone();
	let service = super::service_with(classifier, Vec::new(), Vec::new());

	assert!(matches!(service.route_question("   ").await, Err(Error::Validation { .. })));
	assert_eq!(calls.load(Ordering::SeqCst), 0);
}
