use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::Value;
use tower::util::ServiceExt;

use biolink_api::{routes, state::AppState};
use biolink_service::ClassifierProvider;
use biolink_testkit::{FailingClassifier, StaticClassifier, StaticRecordSource};

fn app_with(classifier: Arc<dyn ClassifierProvider>, records: StaticRecordSource) -> Router {
	let providers = biolink_testkit::providers(classifier, Arc::new(records));
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);

	routes::router(AppState::from_service(service))
}

fn default_app() -> Router {
	app_with(
		Arc::new(FailingClassifier::new()),
		StaticRecordSource::new(
			biolink_testkit::lung_cancer_trials(),
			biolink_testkit::egfr_papers(),
		),
	)
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
	let response = app.oneshot(request).await.expect("Failed to call the router.");
	let status = response.status();
	let body = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json = if body.is_empty() {
		Value::Null
	} else {
		serde_json::from_slice(&body).expect("Failed to parse response.")
	};

	(status, json)
}

#[tokio::test]
async fn health_ok() {
	let request =
		Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request.");
	let (status, _) = call(default_app(), request).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn match_accepts_patient_note_and_ranks_eligible_trials() {
	let payload = serde_json::json!({
		"condition": "lung cancer",
		"patient_note": "70 year old woman with lung cancer.",
		"age": 70,
		"sex": "female",
		"country": "United States",
		"top_k": 3
	});
	let (status, json) = call(default_app(), post_json("/v1/match", payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["status"], "matched");
	assert_eq!(json["candidates"], 2);
	assert_eq!(json["results"].as_array().map(Vec::len), Some(1));
	assert_eq!(json["results"][0]["record_id"], "NCT00000002");
}

#[tokio::test]
async fn match_without_patient_text_is_invalid() {
	let payload = serde_json::json!({ "condition": " ", "patient_note": "" });
	let (status, json) = call(default_app(), post_json("/v1/match", payload)).await;

	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn built_graph_is_readable_and_queryable() {
	let app = default_app();
	let build = serde_json::json!({ "topic": "EGFR", "include_trials": false });
	let (status, json) = call(app.clone(), post_json("/v1/graph/build", build)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["status"], "built");
	assert_eq!(json["papers"], 2);
	assert_eq!(json["trials"], 0);

	let request = Request::builder()
		.uri("/v1/graph/egfr")
		.body(Body::empty())
		.expect("Failed to build request.");
	let (status, snapshot) = call(app.clone(), request).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(snapshot["topic"], "egfr");
	assert_eq!(
		snapshot["edges"].as_array().map(|edges| edges.len() as u64),
		json["edge_count"].as_u64()
	);

	let query = serde_json::json!({ "topic": "EGFR", "query": "What does Tagrisso treat?" });
	let (status, facts) = call(app, post_json("/v1/graph/query", query)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(facts["keywords"][0], "osimertinib");
	assert!(facts["facts"].as_array().is_some_and(|facts| !facts.is_empty()));
}

#[tokio::test]
async fn registry_failure_maps_to_bad_gateway() {
	let app = app_with(
		Arc::new(FailingClassifier::new()),
		StaticRecordSource::new(Vec::new(), biolink_testkit::egfr_papers()).with_paper_failure(),
	);
	let build = serde_json::json!({ "topic": "EGFR" });
	let (status, json) = call(app, post_json("/v1/graph/build", build)).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(json["error_code"], "PROVIDER_FAILURE");
}

#[tokio::test]
async fn route_falls_back_when_the_classifier_fails() {
	let payload = serde_json::json!({ "question": "Which trials recruit for melanoma?" });
	let (status, json) = call(default_app(), post_json("/v1/route", payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["used_fallback"], true);
	assert_eq!(json["actions"].as_array().map(Vec::len), Some(5));
}

#[tokio::test]
async fn route_execute_runs_the_chosen_action() {
	let app = app_with(
		Arc::new(StaticClassifier::actions(&["search_trials"])),
		StaticRecordSource::new(biolink_testkit::lung_cancer_trials(), Vec::new()),
	);
	let payload = serde_json::json!({ "question": "lung cancer trials" });
	let (status, json) = call(app, post_json("/v1/route/execute", payload)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json["decision"]["used_fallback"], false);
	assert_eq!(json["outcomes"][0]["tool"], "search_trials");
	assert_eq!(json["outcomes"][0]["outcome"]["status"], "trials");
	assert_eq!(json["outcomes"][0]["outcome"]["records"].as_array().map(Vec::len), Some(2));
	assert_eq!(json["answer"]["synthesized"], false);
	assert!(json["answer"]["text"].as_str().is_some_and(|text| text.contains("search_trials")));
}

#[tokio::test]
async fn empty_question_is_invalid() {
	let payload = serde_json::json!({ "question": "   " });
	let (status, json) = call(default_app(), post_json("/v1/route", payload)).await;

	assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
	assert_eq!(json["error_code"], "INVALID_REQUEST");
}
