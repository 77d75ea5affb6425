use std::sync::Arc;

use biolink_service::{ActionKind, ActionOutcome};
use biolink_testkit::{FailingClassifier, StaticClassifier, StaticRecordSource};

#[tokio::test]
async fn failing_action_does_not_stop_the_rest() {
	let classifier = StaticClassifier::new(serde_json::json!({
		"actions": [
			"search_literature",
			{
				"tool": "search_trials",
				"params": { "condition": "lung cancer", "country": "Canada" }
			},
			{
				"tool": "match_patient",
				"params": { "condition": "lung cancer", "age": 70, "sex": "female" }
			}
		]
	}));
	let records = StaticRecordSource::new(biolink_testkit::lung_cancer_trials(), Vec::new())
		.with_paper_failure();
	let providers = biolink_testkit::providers(Arc::new(classifier), Arc::new(records));
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);
	let report = service
		.route_and_execute("Trials for a 70 year old woman with lung cancer in Canada")
		.await
		.expect("route_and_execute failed.");

	assert_eq!(report.outcomes.len(), 3);
	assert_eq!(report.outcomes[0].tool, ActionKind::SearchLiterature);
	assert!(matches!(report.outcomes[0].outcome, ActionOutcome::Failed { .. }));

	let ActionOutcome::Trials { records } = &report.outcomes[1].outcome else {
		panic!("Expected trials outcome, got {:?}.", report.outcomes[1].outcome);
	};

	assert_eq!(records.len(), 1);
	assert_eq!(records[0].id, "NCT00000002");

	let ActionOutcome::Match { report: matched } = &report.outcomes[2].outcome else {
		panic!("Expected match outcome, got {:?}.", report.outcomes[2].outcome);
	};

	assert_eq!(matched.results.len(), 1);
	assert_eq!(matched.results[0].record_id, "NCT00000002");
}

#[tokio::test]
async fn direct_answers_run_nothing() {
	let records = Arc::new(StaticRecordSource::default());
	let providers = biolink_testkit::providers(
		Arc::new(StaticClassifier::actions(&["answer_directly"])),
		records.clone(),
	);
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);
	let report = service.route_and_execute("Define biomarker.").await.expect("execute failed.");

	assert!(report.decision.direct_answer);
	assert_eq!(report.outcomes.len(), 1);
	assert_eq!(report.outcomes[0].outcome, ActionOutcome::DirectAnswer);
	assert_eq!(records.trial_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
	assert_eq!(records.paper_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn provider_answer_is_returned_after_the_steps() {
	let classifier = StaticClassifier::new(serde_json::json!({
		"actions": ["search_trials"],
		"answer": "### Summary\nTwo recruiting lung cancer trials were found."
	}));
	let calls = classifier.calls.clone();
	let providers = biolink_testkit::providers(
		Arc::new(classifier),
		Arc::new(StaticRecordSource::new(biolink_testkit::lung_cancer_trials(), Vec::new())),
	);
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);
	let report =
		service.route_and_execute("lung cancer trials").await.expect("route_and_execute failed.");

	assert!(report.answer.synthesized);
	assert!(report.answer.text.contains("Two recruiting lung cancer trials"));
	assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[tokio::test]
async fn answer_falls_back_to_an_outcome_summary() {
	let providers = biolink_testkit::providers(
		Arc::new(FailingClassifier::new()),
		Arc::new(StaticRecordSource::new(biolink_testkit::lung_cancer_trials(), Vec::new())),
	);
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);
	let report =
		service.route_and_execute("lung cancer trials").await.expect("route_and_execute failed.");

	assert!(report.decision.used_fallback);
	assert!(!report.answer.synthesized);
	assert!(report.answer.text.starts_with("### Summary"));
	assert!(report.answer.text.contains("- search_trials: 2 trial(s):"));
	assert!(report.answer.text.contains("- answer_directly: no retrieval needed"));
}
