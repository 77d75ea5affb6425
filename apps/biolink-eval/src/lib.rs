use std::{
	collections::HashSet,
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use biolink_domain::{PatientQuery, Record};
use biolink_service::{BioLinkService, MatchStatus};

pub const DEFAULT_K_VALUES: [usize; 4] = [1, 3, 5, 10];

#[derive(Debug, Parser)]
#[command(
	version = biolink_cli::VERSION,
	rename_all = "kebab",
	styles = biolink_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N")]
	pub top_k: Option<u32>,
	/// Cutoffs for precision, recall, and F1.
	#[arg(
		long = "k",
		value_name = "K",
		value_delimiter = ',',
		default_values_t = DEFAULT_K_VALUES
	)]
	pub k_values: Vec<usize>,
	/// Extra configs evaluated side by side with `--config`.
	#[arg(long, value_name = "FILE")]
	pub compare: Vec<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	top_k: Option<u32>,
	cases: Vec<EvalCase>,
}

#[derive(Debug, Deserialize)]
struct EvalCase {
	id: Option<String>,
	patient: PatientQuery,
	records: Vec<Record>,
	expected_ids: Vec<String>,
	top_k: Option<u32>,
}

#[derive(Debug, Serialize)]
struct EvalOutput {
	dataset: EvalDatasetInfo,
	settings: EvalSettings,
	summary: EvalSummary,
	cases: Vec<CaseReport>,
}

#[derive(Debug, Serialize)]
struct EvalDatasetInfo {
	name: String,
	case_count: usize,
}

#[derive(Debug, Serialize)]
struct EvalSettings {
	config_path: String,
	top_k: u32,
	k_values: Vec<usize>,
	unknown_penalty: f32,
}

#[derive(Debug, Serialize)]
struct EvalSummary {
	at_k: Vec<CutoffMetrics>,
	mean_rr: f64,
	mean_ndcg: f64,
	scores: ScoreStats,
	cases_with_matches: usize,
	cases_with_correct_matches: usize,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
struct CaseReport {
	id: String,
	session_id: Uuid,
	status: MatchStatus,
	candidates: usize,
	eligible: usize,
	expected_count: usize,
	retrieved_count: usize,
	relevant_count: usize,
	at_k: Vec<CutoffMetrics>,
	rr: f64,
	ndcg: f64,
	latency_ms: f64,
	expected_ids: Vec<String>,
	retrieved_ids: Vec<String>,
	retrieved_scores: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
struct CutoffMetrics {
	k: usize,
	precision: f64,
	recall: f64,
	f1: f64,
}

#[derive(Debug, PartialEq)]
struct Metrics {
	at_k: Vec<CutoffMetrics>,
	rr: f64,
	ndcg: f64,
	relevant_count: usize,
}

/// Mean match scores of relevant and irrelevant results; `None` when a side has no results.
#[derive(Debug, Default, PartialEq, Serialize)]
struct ScoreStats {
	avg_score_correct: Option<f64>,
	avg_score_incorrect: Option<f64>,
	score_difference: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ComparisonOutput {
	dataset: EvalDatasetInfo,
	runs: Vec<ComparisonRun>,
	leaders: Vec<MetricLeader>,
}

#[derive(Debug, Serialize)]
struct ComparisonRun {
	config_path: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	result: Option<EvalOutput>,
	#[serde(skip_serializing_if = "Option::is_none")]
	error: Option<String>,
}

#[derive(Debug, PartialEq, Serialize)]
struct MetricLeader {
	metric: String,
	config_path: String,
	value: f64,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = biolink_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let dataset = load_dataset(&args.dataset)?;
	let k_values = normalize_k_values(&args.k_values)?;
	let json = if args.compare.is_empty() {
		let service = BioLinkService::new(config);
		let output = evaluate(&service, &args.config, &dataset, args.top_k, &k_values).await?;

		serde_json::to_string_pretty(&output)?
	} else {
		let mut services = vec![(args.config.clone(), Ok(BioLinkService::new(config)))];

		for path in &args.compare {
			let service = biolink_config::load(path)
				.map(BioLinkService::new)
				.map_err(|err| eyre::eyre!("Failed to load {}: {err}", path.display()));

			services.push((path.clone(), service));
		}

		let output = compare(services, &dataset, args.top_k, &k_values).await;

		serde_json::to_string_pretty(&output)?
	};

	println!("{json}");

	Ok(())
}

fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.cases.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one case."));
	}

	Ok(dataset)
}

/// Sorted, distinct, positive cutoffs.
fn normalize_k_values(raw: &[usize]) -> color_eyre::Result<Vec<usize>> {
	let mut k_values: Vec<usize> = raw.iter().copied().filter(|k| *k > 0).collect();

	k_values.sort_unstable();
	k_values.dedup();

	if k_values.is_empty() {
		return Err(eyre::eyre!("At least one cutoff greater than zero is required."));
	}

	Ok(k_values)
}

async fn evaluate(
	service: &BioLinkService,
	config_path: &Path,
	dataset: &EvalDataset,
	top_k: Option<u32>,
	k_values: &[usize],
) -> color_eyre::Result<EvalOutput> {
	let deepest = k_values.iter().copied().max().unwrap_or(0);
	let default_top_k = top_k
		.or(dataset.top_k)
		.unwrap_or_else(|| service.cfg.matching.default_top_k.max(deepest as u32));
	let mut reports = Vec::with_capacity(dataset.cases.len());
	let mut latencies_ms = Vec::with_capacity(dataset.cases.len());
	let mut scored = Vec::new();

	for (index, case) in dataset.cases.iter().enumerate() {
		let id = case.id.clone().unwrap_or_else(|| format!("case-{}", index + 1));
		let case_top_k = top_k.or(case.top_k).unwrap_or(default_top_k);
		let started = Instant::now();
		let report = service
			.match_trials_with_records(&case.patient, &case.records, case_top_k)
			.await
			.map_err(|err| eyre::eyre!("Case {id} failed: {err}"))?;
		let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
		let retrieved: Vec<String> =
			report.results.iter().map(|result| result.record_id.clone()).collect();
		let scores: Vec<f32> = report.results.iter().map(|result| result.score).collect();
		let expected: HashSet<&str> = case.expected_ids.iter().map(String::as_str).collect();
		let metrics = compute_metrics(&retrieved, &expected, k_values);

		scored.extend(
			retrieved
				.iter()
				.zip(&scores)
				.map(|(id, score)| (*score, expected.contains(id.as_str()))),
		);

		tracing::debug!(case = %id, status = ?report.status, latency_ms, "Case evaluated.");

		reports.push(CaseReport {
			id,
			session_id: report.session_id,
			status: report.status,
			candidates: report.candidates,
			eligible: report.eligible,
			expected_count: expected.len(),
			retrieved_count: retrieved.len(),
			relevant_count: metrics.relevant_count,
			at_k: metrics.at_k,
			rr: metrics.rr,
			ndcg: metrics.ndcg,
			latency_ms,
			expected_ids: case.expected_ids.clone(),
			retrieved_ids: retrieved,
			retrieved_scores: scores,
		});
		latencies_ms.push(latency_ms);
	}

	let summary = summarize(&reports, &latencies_ms, k_values, score_stats(&scored));

	Ok(EvalOutput {
		dataset: dataset_info(dataset),
		settings: EvalSettings {
			config_path: config_path.display().to_string(),
			top_k: default_top_k,
			k_values: k_values.to_vec(),
			unknown_penalty: service.cfg.matching.unknown_penalty,
		},
		summary,
		cases: reports,
	})
}

/// Runs the dataset once per config. A config that fails is reported and the rest still run.
async fn compare(
	services: Vec<(PathBuf, color_eyre::Result<BioLinkService>)>,
	dataset: &EvalDataset,
	top_k: Option<u32>,
	k_values: &[usize],
) -> ComparisonOutput {
	let mut runs = Vec::with_capacity(services.len());

	for (path, service) in services {
		let config_path = path.display().to_string();
		let outcome = match service {
			Ok(service) => evaluate(&service, &path, dataset, top_k, k_values).await,
			Err(err) => Err(err),
		};

		let run = match outcome {
			Ok(output) => ComparisonRun { config_path, result: Some(output), error: None },
			Err(err) => {
				tracing::warn!(config = %config_path, error = %err, "Config evaluation failed.");

				ComparisonRun { config_path, result: None, error: Some(err.to_string()) }
			},
		};

		runs.push(run);
	}

	let leaders = leaders(&runs);

	ComparisonOutput { dataset: dataset_info(dataset), runs, leaders }
}

fn dataset_info(dataset: &EvalDataset) -> EvalDatasetInfo {
	EvalDatasetInfo {
		name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
		case_count: dataset.cases.len(),
	}
}

/// Best run per metric. Ties keep the earlier run.
fn leaders(runs: &[ComparisonRun]) -> Vec<MetricLeader> {
	let mut leaders: Vec<MetricLeader> = Vec::new();

	for run in runs {
		let Some(output) = run.result.as_ref() else {
			continue;
		};

		for (metric, value) in named_metrics(&output.summary) {
			match leaders.iter_mut().find(|leader| leader.metric == metric) {
				Some(leader) =>
					if value > leader.value {
						leader.config_path = run.config_path.clone();
						leader.value = value;
					},
				None => leaders.push(MetricLeader {
					metric,
					config_path: run.config_path.clone(),
					value,
				}),
			}
		}
	}

	leaders
}

fn named_metrics(summary: &EvalSummary) -> Vec<(String, f64)> {
	let mut named = Vec::with_capacity(summary.at_k.len() * 3 + 2);

	for cutoff in &summary.at_k {
		named.push((format!("precision@{}", cutoff.k), cutoff.precision));
		named.push((format!("recall@{}", cutoff.k), cutoff.recall));
		named.push((format!("f1@{}", cutoff.k), cutoff.f1));
	}

	named.push(("mrr".to_string(), summary.mean_rr));
	named.push(("ndcg".to_string(), summary.mean_ndcg));

	named
}

fn compute_metrics(retrieved: &[String], expected: &HashSet<&str>, k_values: &[usize]) -> Metrics {
	let expected_count = expected.len();
	let hits: Vec<bool> = retrieved.iter().map(|id| expected.contains(id.as_str())).collect();
	let relevant_count = hits.iter().filter(|hit| **hit).count();
	let dcg: f64 = hits
		.iter()
		.enumerate()
		.filter(|(_, hit)| **hit)
		.map(|(idx, _)| 1.0 / (idx as f64 + 2.0).log2())
		.sum();
	let rr = hits.iter().position(|hit| *hit).map_or(0.0, |idx| 1.0 / (idx + 1) as f64);
	let idcg: f64 = (1..=expected_count.min(retrieved.len()))
		.map(|rank| 1.0 / (rank as f64 + 1.0).log2())
		.sum();
	let ndcg = if idcg > 0.0 { dcg / idcg } else { 0.0 };
	let at_k = k_values.iter().map(|k| cutoff_metrics(&hits, expected_count, *k)).collect();

	Metrics { at_k, rr, ndcg, relevant_count }
}

/// Precision divides by the results actually returned within the cutoff.
fn cutoff_metrics(hits: &[bool], expected_count: usize, k: usize) -> CutoffMetrics {
	let window = &hits[..hits.len().min(k)];
	let relevant = window.iter().filter(|hit| **hit).count() as f64;
	let precision = if window.is_empty() { 0.0 } else { relevant / window.len() as f64 };
	let recall = if expected_count == 0 { 0.0 } else { relevant / expected_count as f64 };
	let f1 = if precision + recall > 0.0 {
		2.0 * precision * recall / (precision + recall)
	} else {
		0.0
	};

	CutoffMetrics { k, precision, recall, f1 }
}

fn score_stats(scored: &[(f32, bool)]) -> ScoreStats {
	let mean = |correct: bool| {
		let values: Vec<f64> = scored
			.iter()
			.filter(|(_, is_correct)| *is_correct == correct)
			.map(|(score, _)| f64::from(*score))
			.collect();

		if values.is_empty() {
			None
		} else {
			Some(values.iter().sum::<f64>() / values.len() as f64)
		}
	};
	let avg_score_correct = mean(true);
	let avg_score_incorrect = mean(false);
	let score_difference = avg_score_correct.zip(avg_score_incorrect).map(|(hit, miss)| hit - miss);

	ScoreStats { avg_score_correct, avg_score_incorrect, score_difference }
}

fn summarize(
	reports: &[CaseReport],
	latencies_ms: &[f64],
	k_values: &[usize],
	scores: ScoreStats,
) -> EvalSummary {
	let count = reports.len().max(1) as f64;
	let at_k = k_values
		.iter()
		.enumerate()
		.map(|(idx, k)| {
			let cutoffs = reports.iter().filter_map(|report| report.at_k.get(idx));
			let (precision, recall, f1) = cutoffs.fold((0.0, 0.0, 0.0), |acc, cutoff| {
				(acc.0 + cutoff.precision, acc.1 + cutoff.recall, acc.2 + cutoff.f1)
			});

			CutoffMetrics {
				k: *k,
				precision: precision / count,
				recall: recall / count,
				f1: f1 / count,
			}
		})
		.collect();
	let mean_rr = reports.iter().map(|r| r.rr).sum::<f64>() / count;
	let mean_ndcg = reports.iter().map(|r| r.ndcg).sum::<f64>() / count;
	let mut sorted = latencies_ms.to_vec();

	sorted.sort_by(|a, b| a.total_cmp(b));

	EvalSummary {
		at_k,
		mean_rr,
		mean_ndcg,
		scores,
		cases_with_matches: reports.iter().filter(|r| r.retrieved_count > 0).count(),
		cases_with_correct_matches: reports.iter().filter(|r| r.relevant_count > 0).count(),
		latency_ms_p50: percentile(&sorted, 0.50),
		latency_ms_p95: percentile(&sorted, 0.95),
	}
}

/// Linear interpolation over already sorted values.
fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use biolink_testkit::{FailingClassifier, StaticRecordSource};

	fn ids(values: &[&str]) -> Vec<String> {
		values.iter().map(|value| value.to_string()).collect()
	}

	fn service() -> BioLinkService {
		let providers = biolink_testkit::providers(
			Arc::new(FailingClassifier::new()),
			Arc::new(StaticRecordSource::default()),
		);

		biolink_testkit::service(biolink_testkit::test_config(), providers)
	}

	fn lung_dataset() -> EvalDataset {
		EvalDataset {
			name: Some("unit".to_string()),
			top_k: None,
			cases: vec![EvalCase {
				id: None,
				patient: PatientQuery {
					condition: "lung cancer".to_string(),
					note: "70 year old woman.".to_string(),
					age: Some(70),
					sex: Some("female".to_string()),
					country: Some("US".to_string()),
				},
				records: biolink_testkit::lung_cancer_trials(),
				expected_ids: ids(&["NCT00000002"]),
				top_k: Some(3),
			}],
		}
	}

	#[test]
	fn metrics_reward_early_hits() {
		let expected: HashSet<&str> = ["NCT-2", "NCT-9"].into_iter().collect();
		let metrics = compute_metrics(&ids(&["NCT-1", "NCT-2", "NCT-3"]), &expected, &[1, 3]);

		assert_eq!(metrics.relevant_count, 1);
		assert_eq!(metrics.at_k[0], CutoffMetrics { k: 1, precision: 0.0, recall: 0.0, f1: 0.0 });

		let at_3 = &metrics.at_k[1];

		assert!((at_3.precision - 1.0 / 3.0).abs() < 1e-9);
		assert!((at_3.recall - 0.5).abs() < 1e-9);
		assert!((at_3.f1 - 0.4).abs() < 1e-9);
		assert!((metrics.rr - 0.5).abs() < 1e-9);

		let ideal = 1.0 + 1.0 / 3.0_f64.log2();
		let dcg = 1.0 / 3.0_f64.log2();

		assert!((metrics.ndcg - dcg / ideal).abs() < 1e-9);
	}

	#[test]
	fn cutoffs_beyond_the_results_use_what_was_returned() {
		let expected: HashSet<&str> = ["NCT-1"].into_iter().collect();
		let metrics = compute_metrics(&ids(&["NCT-1", "NCT-2"]), &expected, &[10]);

		assert_eq!(metrics.at_k[0].precision, 0.5);
		assert_eq!(metrics.at_k[0].recall, 1.0);
	}

	#[test]
	fn empty_retrieval_scores_zero() {
		let expected: HashSet<&str> = ["NCT-1"].into_iter().collect();
		let metrics = compute_metrics(&[], &expected, &[1, 5]);

		assert_eq!(metrics.relevant_count, 0);
		assert_eq!(metrics.rr, 0.0);
		assert_eq!(metrics.ndcg, 0.0);
		assert!(metrics.at_k.iter().all(|cutoff| cutoff.precision == 0.0 && cutoff.recall == 0.0));
	}

	#[test]
	fn score_stats_split_correct_and_incorrect() {
		let stats = score_stats(&[(0.9, true), (0.7, true), (0.4, false)]);

		assert!((stats.avg_score_correct.unwrap_or_default() - 0.8).abs() < 1e-6);
		assert!((stats.avg_score_incorrect.unwrap_or_default() - 0.4).abs() < 1e-6);
		assert!((stats.score_difference.unwrap_or_default() - 0.4).abs() < 1e-6);
		assert_eq!(score_stats(&[(0.5, true)]).score_difference, None);
	}

	#[test]
	fn k_values_are_sorted_and_distinct() {
		assert_eq!(
			normalize_k_values(&[5, 1, 5, 0, 3]).expect("Cutoffs must parse."),
			vec![1, 3, 5]
		);
		assert!(normalize_k_values(&[0]).is_err());
	}

	#[test]
	fn percentile_interpolates() {
		assert_eq!(percentile(&[], 0.5), 0.0);
		assert_eq!(percentile(&[1.0, 3.0], 0.5), 2.0);
		assert_eq!(percentile(&[1.0, 2.0, 3.0], 0.5), 2.0);
		assert_eq!(percentile(&[1.0, 2.0, 3.0], 1.5), 3.0);
	}

	#[test]
	fn bundled_dataset_parses() {
		let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("datasets/lung_cancer.json");
		let dataset = load_dataset(&path).expect("Bundled dataset must load.");

		assert!(!dataset.cases.is_empty());
		assert!(dataset.cases.iter().all(|case| !case.expected_ids.is_empty()));
	}

	#[tokio::test]
	async fn evaluation_scores_supplied_records() {
		let output = evaluate(&service(), Path::new("unit.toml"), &lung_dataset(), None, &[1, 3])
			.await
			.expect("Evaluation failed.");

		assert_eq!(output.dataset.case_count, 1);
		assert_eq!(output.cases[0].id, "case-1");
		assert_eq!(output.cases[0].retrieved_ids, ids(&["NCT00000002"]));
		assert_eq!(output.summary.at_k[0].recall, 1.0);
		assert_eq!(output.summary.at_k[1].f1, 1.0);
		assert_eq!(output.summary.mean_rr, 1.0);
		assert_eq!(output.summary.cases_with_correct_matches, 1);
		assert!(output.summary.scores.avg_score_correct.is_some());
		assert_eq!(output.summary.scores.avg_score_incorrect, None);
	}

	#[tokio::test]
	async fn comparison_reports_failed_configs_and_leaders() {
		let services = vec![
			(PathBuf::from("a.toml"), Ok(service())),
			(PathBuf::from("b.toml"), Err(eyre::eyre!("Config is unreadable."))),
		];
		let output = compare(services, &lung_dataset(), None, &[1]).await;

		assert_eq!(output.runs.len(), 2);
		assert!(output.runs[0].result.is_some());
		assert_eq!(output.runs[1].error.as_deref(), Some("Config is unreadable."));

		let metrics: Vec<&str> =
			output.leaders.iter().map(|leader| leader.metric.as_str()).collect();

		assert_eq!(metrics, vec!["precision@1", "recall@1", "f1@1", "mrr", "ndcg"]);
		assert!(output.leaders.iter().all(|leader| leader.config_path == "a.toml"));
	}
}
