//! Inbound request handling: one credentialed, bounded outbound client per request.

// crates.io
use axum::{
	Router,
	body::Bytes,
	extract::{Query, State, rejection::QueryRejection},
	http::{HeaderMap, HeaderValue, StatusCode, header},
	response::{IntoResponse, Response},
	routing::get,
};
use tower_http::trace::TraceLayer;
// self
use crate::{
	_prelude::*,
	auth::TokenExtractor,
	client::OutboundClient,
	config::{GatewayConfig, HEALTH_PATH},
	gate::ConcurrencyGate,
	graphql::{self, GraphqlExecutor, GraphqlParams, GraphqlRequest, GraphqlRequestError, GraphqlResponse},
};

/// Methods answered on the GraphQL endpoint.
pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

const ENTRY_TITLE: &str = "GraphQL playground";

/// Shared router state. Only the gate carries mutable state across requests.
#[derive(Clone)]
pub struct AppState {
	extractor: TokenExtractor,
	gate: ConcurrencyGate,
	executor: Arc<dyn GraphqlExecutor>,
	endpoint: Arc<str>,
	request_timeout: Option<Duration>,
	abort: CancellationToken,
}
impl AppState {
	/// Assembles state for `config`.
	pub fn new(
		extractor: TokenExtractor,
		gate: ConcurrencyGate,
		executor: Arc<dyn GraphqlExecutor>,
		config: &GatewayConfig,
	) -> Self {
		Self {
			extractor,
			gate,
			executor,
			endpoint: Arc::from(config.endpoint.as_str()),
			request_timeout: config.request_timeout,
			abort: CancellationToken::new(),
		}
	}

	/// Gate shared by every outbound call.
	pub fn gate(&self) -> &ConcurrencyGate {
		&self.gate
	}

	/// Parent of every request scope; cancelling it cancels all in-flight outbound calls.
	pub fn abort_token(&self) -> CancellationToken {
		self.abort.clone()
	}

	/// Builds the per-request client: credential extraction first, then the gate.
	pub fn outbound_client(&self, headers: &HeaderMap, scope: CancellationToken) -> OutboundClient {
		self.extractor.client_from_headers(headers, scope).bounded(self.gate.clone())
	}

	async fn execute(&self, headers: &HeaderMap, request: GraphqlRequest) -> Response {
		let scope = self.abort.child_token();
		// Dropping this future (client disconnect, forced close) cancels every outbound call.
		let _scope_guard = scope.clone().drop_guard();
		let client = self.outbound_client(headers, scope.clone());
		let execution = self.executor.execute(request, client);

		match self.request_timeout {
			Some(limit) => match tokio::time::timeout(limit, execution).await {
				Ok(response) => response.into_response(),
				Err(_) => {
					scope.cancel();
					tracing::warn!(timeout_ms = limit.as_millis() as u64, "GraphQL request timed out.");

					GraphqlResponse::error(StatusCode::GATEWAY_TIMEOUT, "The request timed out.")
						.into_response()
				},
			},
			None => execution.await.into_response(),
		}
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("gate", &self.gate)
			.field("endpoint", &self.endpoint)
			.field("request_timeout", &self.request_timeout)
			.finish()
	}
}

/// Builds the HTTP surface: entry page, liveness, and the GraphQL endpoint.
pub fn router(state: AppState) -> Router {
	let endpoint = state.endpoint.clone();

	Router::new()
		.route("/", get(entry))
		.route(HEALTH_PATH, get(health))
		.route(&endpoint, get(graphql_get).post(graphql_post).options(graphql_options))
		.layer(TraceLayer::new_for_http())
		.with_state(state)
}

async fn entry(State(state): State<AppState>) -> Response {
	graphql::entry_page(ENTRY_TITLE, &state.endpoint).into_response()
}

async fn health() -> &'static str {
	"ok"
}

async fn graphql_get(
	State(state): State<AppState>,
	headers: HeaderMap,
	params: Result<Query<GraphqlParams>, QueryRejection>,
) -> Response {
	let request = params
		.map_err(|e| GraphqlRequestError::InvalidQueryString { message: e.body_text() })
		.and_then(|Query(params)| GraphqlRequest::from_params(params));

	match request {
		Ok(request) => state.execute(&headers, request).await,
		Err(e) => e.into_response(),
	}
}

async fn graphql_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
	let request = ensure_json(&headers).and_then(|()| GraphqlRequest::from_json(&body));

	match request {
		Ok(request) => state.execute(&headers, request).await,
		Err(e) => e.into_response(),
	}
}

async fn graphql_options() -> Response {
	(StatusCode::NO_CONTENT, [(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS))])
		.into_response()
}

fn ensure_json(headers: &HeaderMap) -> Result<(), GraphqlRequestError> {
	let content_type = headers
		.get(header::CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.unwrap_or_default();
	let mime = content_type.split(';').next().unwrap_or_default().trim();

	if mime.eq_ignore_ascii_case("application/json") || mime.to_ascii_lowercase().ends_with("+json")
	{
		Ok(())
	} else {
		Err(GraphqlRequestError::UnsupportedContentType { content_type: content_type.into() })
	}
}
