use std::sync::Arc;

use biolink_service::BioLinkService;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BioLinkService>,
}
impl AppState {
	/// Live registries and providers, with the graph store chosen by `graph.store`.
	pub fn new(config: biolink_config::Config) -> Self {
		Self::from_service(BioLinkService::new(config))
	}

	pub fn from_service(service: BioLinkService) -> Self {
		Self { service: Arc::new(service) }
	}
}
