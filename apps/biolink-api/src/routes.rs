use axum::{
	Json, Router,
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use biolink_domain::PatientQuery;
use biolink_service::{
	Error as ServiceError, ExecutionReport, GraphBuildOverrides, GraphBuildReport,
	GraphQueryResponse, MatchReport, RoutingDecision,
};
use biolink_storage::GraphSnapshot;

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
	#[serde(flatten)]
	pub patient: PatientQuery,
	pub top_k: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct GraphBuildRequest {
	pub topic: String,
	#[serde(flatten)]
	pub overrides: GraphBuildOverrides,
}

#[derive(Debug, Deserialize)]
pub struct GraphQueryRequest {
	pub topic: String,
	pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
	pub question: String,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/match", post(match_trials))
		.route("/v1/graph/build", post(build_graph))
		.route("/v1/graph/query", post(query_graph))
		.route("/v1/graph/{topic}", get(graph_snapshot))
		.route("/v1/route", post(route))
		.route("/v1/route/execute", post(route_and_execute))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn match_trials(
	State(state): State<AppState>,
	Json(payload): Json<MatchRequest>,
) -> Result<Json<MatchReport>, ApiError> {
	let response = state.service.match_trials(&payload.patient, payload.top_k).await?;
	Ok(Json(response))
}

async fn build_graph(
	State(state): State<AppState>,
	Json(payload): Json<GraphBuildRequest>,
) -> Result<Json<GraphBuildReport>, ApiError> {
	let response = state.service.build_graph(&payload.topic, &payload.overrides).await?;
	Ok(Json(response))
}

async fn graph_snapshot(
	State(state): State<AppState>,
	Path(topic): Path<String>,
) -> Result<Json<GraphSnapshot>, ApiError> {
	let response = state.service.graph_snapshot(&topic).await?;
	Ok(Json(response))
}

async fn query_graph(
	State(state): State<AppState>,
	Json(payload): Json<GraphQueryRequest>,
) -> Result<Json<GraphQueryResponse>, ApiError> {
	let response = state.service.query_graph(&payload.topic, &payload.query).await?;
	Ok(Json(response))
}

async fn route(
	State(state): State<AppState>,
	Json(payload): Json<RouteRequest>,
) -> Result<Json<RoutingDecision>, ApiError> {
	let response = state.service.route_question(&payload.question).await?;
	Ok(Json(response))
}

async fn route_and_execute(
	State(state): State<AppState>,
	Json(payload): Json<RouteRequest>,
) -> Result<Json<ExecutionReport>, ApiError> {
	let response = state.service.route_and_execute(&payload.question).await?;
	Ok(Json(response))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::Validation { .. } => json_error(
				StatusCode::UNPROCESSABLE_ENTITY,
				"INVALID_REQUEST",
				err.to_string(),
				None,
			),
			ServiceError::Provider { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "PROVIDER_FAILURE", err.to_string(), None),
			ServiceError::Storage { .. } => {
				tracing::error!(error = %err, "Graph store failed.");

				json_error(
					StatusCode::INTERNAL_SERVER_ERROR,
					"STORAGE_ERROR",
					"Graph storage is unavailable.",
					None,
				)
			},
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };
		(self.status, Json(body)).into_response()
	}
}
