use std::sync::Arc;

use biolink_service::{BioLinkService, GraphBuildOverrides};
use biolink_storage::GraphBuilder;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_builds_of_one_topic_do_not_lose_updates() {
	let service: Arc<BioLinkService> =
		Arc::new(super::records_service(Vec::new(), biolink_testkit::egfr_papers()));
	let overrides = GraphBuildOverrides { include_trials: Some(false), ..Default::default() };
	let mut handles = Vec::new();

	for _ in 0..8 {
		let service = service.clone();
		let overrides = overrides.clone();

		handles.push(tokio::spawn(async move { service.build_graph("EGFR", &overrides).await }));
	}

	let mut new_nodes = 0;

	for handle in handles {
		let report = handle.await.expect("Build task panicked.").expect("build_graph failed.");

		new_nodes += report.delta.new_nodes;
	}

	let snapshot = service.graph_snapshot("egfr").await.expect("graph_snapshot failed.");

	assert_eq!(new_nodes, snapshot.nodes.len());

	let builder = GraphBuilder::from_snapshot(snapshot).expect("Snapshot must reload.");

	assert!(builder.edge_count() > 0);
}
