use biolink_domain::{EntityKey, EntityType, Record, RelationKind, Source};
use biolink_service::{Error, GraphBuildOverrides, GraphBuildStatus};
use biolink_storage::GraphDelta;

fn papers_only() -> GraphBuildOverrides {
	GraphBuildOverrides { include_trials: Some(false), ..Default::default() }
}

#[tokio::test]
async fn shared_drug_gene_sentence_yields_one_edge_with_both_sources() {
	let service = super::records_service(Vec::new(), biolink_testkit::egfr_papers());
	let report = service.build_graph("EGFR", &papers_only()).await.expect("build_graph failed.");

	assert_eq!(report.status, GraphBuildStatus::Built);
	assert_eq!(report.papers, 2);
	assert_eq!(report.trials, 0);

	let drug = EntityKey::new(EntityType::Drug, "osimertinib");
	let gene = EntityKey::new(EntityType::Gene, "egfr");
	let targets: Vec<_> = report
		.snapshot
		.edges
		.iter()
		.filter(|edge| {
			edge.source == drug && edge.relation == RelationKind::Targets && edge.target == gene
		})
		.collect();

	assert_eq!(targets.len(), 1);
	assert!(targets[0].provenance.contains("PMID-1001"));
	assert!(targets[0].provenance.contains("PMID-1002"));
	assert_eq!(targets[0].evidence.len(), 2);
}

#[tokio::test]
async fn rebuilding_the_same_topic_only_merges() {
	let service = super::records_service(Vec::new(), biolink_testkit::egfr_papers());
	let first = service.build_graph("EGFR", &papers_only()).await.expect("First build failed.");
	let second = service.build_graph("egfr", &papers_only()).await.expect("Second build failed.");

	assert!(first.delta.new_nodes > 0);
	assert!(first.delta.new_edges > 0);
	assert_eq!(second.delta.new_nodes, 0);
	assert_eq!(second.delta.new_edges, 0);
	assert_eq!(second.delta.merged_nodes, first.delta.new_nodes + first.delta.merged_nodes);
	assert_eq!(second.delta.merged_edges, first.delta.new_edges + first.delta.merged_edges);
	assert_eq!(first.fingerprint, second.fingerprint);
	assert_eq!(first.node_count, second.node_count);
}

#[tokio::test]
async fn synonyms_merge_into_one_entity_with_both_aliases() {
	let papers = vec![
		Record::new("PMID-1", Source::Paper, "Imaging", "Pulmonary malignancy was detected early."),
		Record::new("PMID-2", Source::Paper, "Screening", "Lung cancer screening saves lives."),
	];
	let service = super::records_service(Vec::new(), papers);
	let report =
		service.build_graph("screening", &papers_only()).await.expect("build_graph failed.");
	let key = EntityKey::new(EntityType::Disease, "lung cancer");
	let nodes: Vec<_> = report.snapshot.nodes.iter().filter(|node| node.key == key).collect();

	assert_eq!(nodes.len(), 1);
	assert!(nodes[0].aliases.contains("Pulmonary malignancy"));
	assert!(nodes[0].aliases.contains("Lung cancer"));
}

#[tokio::test]
async fn records_without_entities_report_no_entities() {
	let papers =
		vec![Record::new("PMID-9", Source::Paper, "Editorial", "We thank the reviewers.")];
	let service = super::records_service(Vec::new(), papers);
	let report = service.build_graph("thanks", &papers_only()).await.expect("build_graph failed.");

	assert_eq!(report.status, GraphBuildStatus::NoEntities);
	assert_eq!(report.delta, GraphDelta::default());
	assert_eq!(report.node_count, 0);
	assert!(report.snapshot.is_empty());
	assert!(service.graph_snapshot("thanks").await.expect("graph_snapshot failed.").is_empty());
}

#[tokio::test]
async fn graph_queries_match_canonical_names_and_aliases() {
	let service = super::records_service(Vec::new(), biolink_testkit::egfr_papers());

	service.build_graph("EGFR", &papers_only()).await.expect("build_graph failed.");

	let by_brand =
		service.query_graph("EGFR", "What does Tagrisso target?").await.expect("query failed.");

	assert_eq!(by_brand.keywords, vec!["osimertinib".to_string()]);
	assert!(by_brand.facts.iter().any(|fact| fact.relation == RelationKind::Targets));
	assert!(by_brand.facts.len() <= biolink_service::graph::MAX_FACTS_PER_KEYWORD);

	let empty = service.query_graph("EGFR", " ?? ").await;

	assert!(matches!(empty, Err(Error::Validation { .. })));
	assert!(matches!(service.graph_snapshot("  ").await, Err(Error::Validation { .. })));
}
