use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use color_eyre::Result;
use reqwest::{Client, Url};
use rmcp::{
	ErrorData, ServerHandler,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde_json::Value;
use tokio::net::TcpListener;

#[derive(Clone)]
struct BioLinkMcp {
	api_base: String,
	client: Client,
	tool_router: ToolRouter<Self>,
}
impl BioLinkMcp {
	fn new(api_base: String) -> Self {
		Self { api_base, client: Client::new(), tool_router: Self::tool_router() }
	}

	async fn forward_post(
		&self,
		path: &str,
		params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let url = format!("{}{}", self.api_base, path);
		let response =
			self.client.post(url).json(&Value::Object(params)).send().await.map_err(|err| {
				ErrorData::internal_error(format!("BioLink API request failed: {err}"), None)
			})?;

		handle_response(response).await
	}

	async fn forward_get(&self, url: Url) -> Result<CallToolResult, ErrorData> {
		let response = self.client.get(url).send().await.map_err(|err| {
			ErrorData::internal_error(format!("BioLink API request failed: {err}"), None)
		})?;

		handle_response(response).await
	}
}

#[rmcp::tool_router]
impl BioLinkMcp {
	#[rmcp::tool(
		name = "biolink_match_trials",
		description = "Rank recruiting clinical trials for a patient. Hard age, sex, and country constraints filter trials before semantic ranking.",
		input_schema = match_trials_schema()
	)]
	async fn biolink_match_trials(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/match", params).await
	}

	#[rmcp::tool(
		name = "biolink_build_graph",
		description = "Fetch papers and trials for a topic and merge their entities and relations into the topic's knowledge graph.",
		input_schema = build_graph_schema()
	)]
	async fn biolink_build_graph(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/graph/build", params).await
	}

	#[rmcp::tool(
		name = "biolink_graph_get",
		description = "Fetch the stored knowledge graph of a topic.",
		input_schema = graph_get_schema()
	)]
	async fn biolink_graph_get(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let topic = take_required_string(&mut params, "topic")?;
		let url = graph_url(&self.api_base, &topic)?;

		self.forward_get(url).await
	}

	#[rmcp::tool(
		name = "biolink_graph_query",
		description = "Return facts from a topic's knowledge graph that mention the entities in a question.",
		input_schema = graph_query_schema()
	)]
	async fn biolink_graph_query(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/graph/query", params).await
	}

	#[rmcp::tool(
		name = "biolink_route",
		description = "Choose the retrieval tools a biomedical question needs, without running them.",
		input_schema = route_schema()
	)]
	async fn biolink_route(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/route", params).await
	}

	#[rmcp::tool(
		name = "biolink_route_execute",
		description = "Route a biomedical question, run every chosen tool in order, and answer from their results.",
		input_schema = route_schema()
	)]
	async fn biolink_route_execute(&self, params: JsonObject) -> Result<CallToolResult, ErrorData> {
		self.forward_post("/v1/route/execute", params).await
	}
}

#[rmcp::tool_handler]
impl ServerHandler for BioLinkMcp {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"BioLink MCP adapter that forwards tool calls to the BioLink HTTP API.".to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

pub async fn serve_mcp(bind_addr: &str, api_base: &str) -> Result<()> {
	let bind_addr: SocketAddr = bind_addr.parse()?;
	let api_base = normalize_api_base(api_base);
	let session_manager: Arc<LocalSessionManager> = Default::default();

	tracing::info!(%bind_addr, %api_base, "MCP server listening.");

	let service = StreamableHttpService::new(
		move || Ok(BioLinkMcp::new(api_base.clone())),
		session_manager,
		StreamableHttpServerConfig::default(),
	);
	let router = Router::new().fallback_service(service);
	let listener = TcpListener::bind(bind_addr).await?;

	axum::serve(listener, router).await?;

	Ok(())
}

fn normalize_api_base(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');
	let (scheme, rest) = if let Some(value) = trimmed.strip_prefix("http://") {
		("http://", value)
	} else if let Some(value) = trimmed.strip_prefix("https://") {
		("https://", value)
	} else {
		("http://", trimmed)
	};
	// The adapter runs next to the API, so a wildcard bind is reached over loopback.
	let rest = if let Some(value) = rest.strip_prefix("0.0.0.0:") {
		format!("127.0.0.1:{value}")
	} else if let Some(value) = rest.strip_prefix("[::]:") {
		format!("127.0.0.1:{value}")
	} else {
		rest.to_string()
	};

	format!("{scheme}{rest}")
}

/// Topic goes in as a single escaped path segment.
fn graph_url(api_base: &str, topic: &str) -> Result<Url, ErrorData> {
	let mut url = Url::parse(&format!("{api_base}/v1/graph")).map_err(|err| {
		ErrorData::internal_error(format!("Invalid BioLink API base: {err}"), None)
	})?;

	url.path_segments_mut()
		.map_err(|_| ErrorData::internal_error("BioLink API base cannot carry a path.", None))?
		.push(topic);

	Ok(url)
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?
		.trim();

	if text.is_empty() {
		return Err(ErrorData::invalid_params(format!("{key} must be non-empty."), None));
	}

	Ok(text.to_string())
}

fn match_trials_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": true,
		"properties": {
			"condition": { "type": "string" },
			"patient_note": { "type": "string" },
			"age": { "type": ["integer", "null"], "minimum": 0 },
			"sex": { "type": ["string", "null"], "enum": ["male", "female", null] },
			"country": { "type": ["string", "null"] },
			"top_k": { "type": ["integer", "null"], "minimum": 1 }
		}
	}))
}

fn build_graph_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": true,
		"required": ["topic"],
		"properties": {
			"topic": { "type": "string" },
			"max_papers": { "type": ["integer", "null"], "minimum": 0 },
			"max_trials": { "type": ["integer", "null"], "minimum": 0 },
			"include_trials": { "type": ["boolean", "null"] }
		}
	}))
}

fn graph_get_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": true,
		"required": ["topic"],
		"properties": {
			"topic": { "type": "string" }
		}
	}))
}

fn graph_query_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": true,
		"required": ["topic", "query"],
		"properties": {
			"topic": { "type": "string" },
			"query": { "type": "string" }
		}
	}))
}

fn route_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"additionalProperties": true,
		"required": ["question"],
		"properties": {
			"question": { "type": "string" }
		}
	}))
}

async fn handle_response(response: reqwest::Response) -> Result<CallToolResult, ErrorData> {
	let status = response.status();
	let bytes = response.bytes().await.map_err(|err| {
		ErrorData::internal_error(format!("BioLink API response error: {err}"), None)
	})?;
	let parsed = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
		let raw = String::from_utf8_lossy(&bytes).to_string();

		serde_json::json!({ "raw": raw })
	});

	if status.is_success() {
		Ok(CallToolResult::structured(parsed))
	} else {
		Ok(CallToolResult::structured_error(parsed))
	}
}
