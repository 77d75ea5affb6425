use biolink_domain::{PatientQuery, Record, Source, Verdict, fields};
use biolink_service::{Error, MatchStatus};

fn older_woman_in_us() -> PatientQuery {
	PatientQuery {
		condition: "lung cancer".to_string(),
		note: "70 year old woman with a new lung cancer diagnosis.".to_string(),
		age: Some(70),
		sex: Some("female".to_string()),
		country: Some("US".to_string()),
	}
}

#[tokio::test]
async fn age_bound_removes_trial_and_keeps_the_wider_one() {
	let service = super::records_service(biolink_testkit::lung_cancer_trials(), Vec::new());
	let report =
		service.match_trials(&older_woman_in_us(), Some(5)).await.expect("match_trials failed.");

	assert_eq!(report.status, MatchStatus::Matched);
	assert_eq!(report.candidates, 2);
	assert_eq!(report.results.len(), 1);

	let result = &report.results[0];

	assert_eq!(result.record_id, "NCT00000002");
	assert_eq!(result.verdicts.age, Verdict::Pass);
	assert_eq!(result.verdicts.sex, Verdict::Pass);
	assert_eq!(result.verdicts.location, Verdict::Pass);
	assert!((0.0..=1.0).contains(&result.score));
	assert!(result.snippet.to_lowercase().contains("lung cancer"));
}

#[tokio::test]
async fn missing_fields_report_unknown_and_take_the_penalty() {
	let mut cfg = biolink_testkit::test_config();

	cfg.matching.unknown_penalty = 0.2;

	let trials = vec![
		Record::new("NCT-A", Source::Trial, "Lung cancer study", "Adults with lung cancer.")
			.with_field(fields::AGE_MIN, "18 Years")
			.with_field(fields::SEX, "ALL")
			.with_field(fields::COUNTRIES, vec!["United States".to_string()]),
		Record::new("NCT-B", Source::Trial, "Lung cancer study", "Adults with lung cancer."),
	];
	let providers = biolink_testkit::providers(
		std::sync::Arc::new(biolink_testkit::FailingClassifier::new()),
		std::sync::Arc::new(biolink_testkit::StaticRecordSource::default()),
	);
	let service = biolink_testkit::service(cfg, providers);
	let report = service
		.match_trials_with_records(&older_woman_in_us(), &trials, 5)
		.await
		.expect("match_trials_with_records failed.");

	assert_eq!(report.results.len(), 2);
	assert_eq!(report.results[0].record_id, "NCT-A");

	let unknown = &report.results[1];

	assert_eq!(unknown.record_id, "NCT-B");
	assert_eq!(unknown.verdicts.age, Verdict::Unknown);
	assert_eq!(unknown.verdicts.sex, Verdict::Unknown);
	assert_eq!(unknown.verdicts.location, Verdict::Unknown);
	assert!(unknown.score < report.results[0].score);
}

#[tokio::test]
async fn patient_sex_all_matches_single_sex_trials() {
	let service = super::records_service(Vec::new(), Vec::new());
	let mut patient = older_woman_in_us();

	patient.sex = Some("all".to_string());

	let trials = vec![
		Record::new("NCT-MEN", Source::Trial, "Lung cancer study", "Men with lung cancer.")
			.with_field(fields::SEX, "MALE"),
	];
	let report = service
		.match_trials_with_records(&patient, &trials, 3)
		.await
		.expect("Sex all must not be rejected.");

	assert_eq!(report.status, MatchStatus::Matched);
	assert_eq!(report.results[0].verdicts.sex, Verdict::Pass);
}

#[tokio::test]
async fn equal_scores_keep_fetch_order() {
	let service = super::records_service(Vec::new(), Vec::new());
	let trials = vec![
		Record::new("NCT-Z", Source::Trial, "Lung cancer study", "Adults with lung cancer."),
		Record::new("NCT-M", Source::Trial, "Lung cancer study", "Adults with lung cancer."),
		Record::new("NCT-A", Source::Trial, "Lung cancer study", "Adults with lung cancer."),
	];
	let report = service
		.match_trials_with_records(&older_woman_in_us(), &trials, 3)
		.await
		.expect("match_trials_with_records failed.");
	let ids: Vec<&str> = report.results.iter().map(|result| result.record_id.as_str()).collect();

	assert_eq!(report.results[0].score, report.results[2].score);
	assert_eq!(ids, vec!["NCT-Z", "NCT-M", "NCT-A"]);
}

#[tokio::test]
async fn empty_results_are_signals_not_errors() {
	let service = super::records_service(Vec::new(), Vec::new());
	let none = service.match_trials(&older_woman_in_us(), None).await.expect("match failed.");

	assert_eq!(none.status, MatchStatus::NoCandidates);
	assert!(none.results.is_empty());

	let too_young = vec![
		Record::new("NCT-KIDS", Source::Trial, "Pediatric lung study", "Children only.")
			.with_field(fields::AGE_MAX, "17 Years"),
	];
	let report = service
		.match_trials_with_records(&older_woman_in_us(), &too_young, 3)
		.await
		.expect("match failed.");

	assert_eq!(report.status, MatchStatus::NoEligibleRecords);
	assert!(report.results.is_empty());
}

#[tokio::test]
async fn invalid_inputs_are_rejected() {
	let service = super::records_service(biolink_testkit::lung_cancer_trials(), Vec::new());
	let zero = service.match_trials(&older_woman_in_us(), Some(0)).await;

	assert!(matches!(zero, Err(Error::Validation { .. })));

	let mut patient = older_woman_in_us();

	patient.sex = Some("unspecified".to_string());

	assert!(matches!(
		service.match_trials(&patient, Some(3)).await,
		Err(Error::Validation { .. })
	));

	patient.sex = None;
	patient.age = Some(151);

	assert!(matches!(
		service.match_trials(&patient, Some(3)).await,
		Err(Error::Validation { .. })
	));
}

#[tokio::test]
async fn wrong_vector_length_is_a_provider_failure() {
	let providers = biolink_service::Providers::new(
		std::sync::Arc::new(biolink_testkit::ShortEmbedding),
		std::sync::Arc::new(biolink_testkit::FailingClassifier::new()),
		std::sync::Arc::new(biolink_testkit::StaticRecordSource::default()),
	);
	let service = biolink_testkit::service(biolink_testkit::test_config(), providers);
	let result = service
		.match_trials_with_records(&older_woman_in_us(), &biolink_testkit::lung_cancer_trials(), 3)
		.await;

	assert!(matches!(result, Err(Error::Provider { .. })));
}
