//! GraphQL-over-HTTP plumbing and the executor seam.
//!
//! Decoding covers the `GET` (query string) and `POST` (JSON body) transports. What a
//! document means is up to the [`GraphqlExecutor`]; this module never inspects fields.

pub mod entry;
pub mod upstream;

pub use entry::*;
pub use upstream::*;

// crates.io
use axum::{
	Json,
	http::StatusCode,
	response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
// self
use crate::{_prelude::*, client::OutboundClient};

/// Boxed future returned by [`GraphqlExecutor::execute`].
pub type ExecutorFuture<'a> = Pin<Box<dyn Future<Output = GraphqlResponse> + 'a + Send>>;

/// Executes one GraphQL request using the per-request outbound client.
///
/// Executors report failures inside the [`GraphqlResponse`] envelope, so the output is
/// infallible from the handler's point of view.
pub trait GraphqlExecutor
where
	Self: 'static + Send + Sync,
{
	/// Runs `request`, reaching the upstream API only through `client`.
	fn execute(&self, request: GraphqlRequest, client: OutboundClient) -> ExecutorFuture<'_>;
}

/// Decoded GraphQL request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
	/// GraphQL document.
	pub query: String,
	/// Operation to run when the document holds several.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub operation_name: Option<String>,
	/// Variable values keyed by name.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub variables: Option<Map<String, Value>>,
	/// Protocol extensions (persisted queries and the like), passed through untouched.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extensions: Option<Map<String, Value>>,
}
impl GraphqlRequest {
	/// Creates a request for `query` with no operation name or variables.
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), operation_name: None, variables: None, extensions: None }
	}

	/// Decodes a `POST` body.
	pub fn from_json(body: &[u8]) -> Result<Self, GraphqlRequestError> {
		let de = &mut serde_json::Deserializer::from_slice(body);
		let request: Self = serde_path_to_error::deserialize(de)
			.map_err(|source| GraphqlRequestError::InvalidBody { source })?;

		request.ensure_query()
	}

	/// Decodes `GET` query parameters; `variables` and `extensions` are JSON-encoded objects.
	pub fn from_params(params: GraphqlParams) -> Result<Self, GraphqlRequestError> {
		let query = params.query.ok_or(GraphqlRequestError::MissingQuery)?;
		let variables = params
			.variables
			.as_deref()
			.map(|raw| decode_object(raw, "variables"))
			.transpose()?
			.flatten();
		let extensions = params
			.extensions
			.as_deref()
			.map(|raw| decode_object(raw, "extensions"))
			.transpose()?
			.flatten();
		let request = Self {
			query,
			operation_name: params.operation_name.filter(|name| !name.is_empty()),
			variables,
			extensions,
		};

		request.ensure_query()
	}

	fn ensure_query(self) -> Result<Self, GraphqlRequestError> {
		if self.query.trim().is_empty() { Err(GraphqlRequestError::MissingQuery) } else { Ok(self) }
	}
}

/// Raw `GET` query parameters.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlParams {
	/// GraphQL document.
	pub query: Option<String>,
	/// Operation name.
	pub operation_name: Option<String>,
	/// JSON-encoded variables object.
	pub variables: Option<String>,
	/// JSON-encoded extensions object.
	pub extensions: Option<String>,
}

/// Reasons an inbound request cannot be decoded.
#[derive(Debug, ThisError)]
pub enum GraphqlRequestError {
	/// The request carries no document.
	#[error("The request does not contain a GraphQL query.")]
	MissingQuery,
	/// The `POST` body is not a GraphQL request object.
	#[error("The request body is not a valid GraphQL request at `{}`.", .source.path())]
	InvalidBody {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A JSON-encoded query parameter is malformed.
	#[error("The `{param}` parameter must be a JSON object.")]
	InvalidParam {
		/// Parameter name.
		param: &'static str,
		/// Parsing failure, if the value was not JSON at all.
		#[source]
		source: Option<serde_json::Error>,
	},
	/// The query string could not be decoded.
	#[error("The query string could not be decoded: {message}.")]
	InvalidQueryString {
		/// Decoder message.
		message: String,
	},
	/// The `POST` body is not JSON.
	#[error("Unsupported content type `{content_type}`; send `application/json`.")]
	UnsupportedContentType {
		/// Received content type.
		content_type: String,
	},
}
impl GraphqlRequestError {
	/// HTTP status for the error envelope.
	pub fn status(&self) -> StatusCode {
		match self {
			Self::UnsupportedContentType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
			_ => StatusCode::BAD_REQUEST,
		}
	}
}
impl IntoResponse for GraphqlRequestError {
	fn into_response(self) -> Response {
		GraphqlResponse::error(self.status(), self.to_string()).into_response()
	}
}

/// JSON document plus the HTTP status it is served with.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphqlResponse {
	/// HTTP status.
	pub status: StatusCode,
	/// JSON body.
	pub body: Value,
}
impl GraphqlResponse {
	/// Serves `body` with `200 OK`.
	pub fn ok(body: Value) -> Self {
		Self { status: StatusCode::OK, body }
	}

	/// Request-level failure: `{"errors": [{"message": …}]}` with `status`.
	pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
		let message: String = message.into();

		Self { status, body: json!({ "errors": [{ "message": message }] }) }
	}

	/// Execution failure: `{"data": null, "errors": [{"message": …}]}` with `200 OK`.
	pub fn execution_error(message: impl Into<String>, extensions: Option<Value>) -> Self {
		let message: String = message.into();
		let mut error = json!({ "message": message });

		if let Some(extensions) = extensions {
			error["extensions"] = extensions;
		}

		Self::ok(json!({ "data": null, "errors": [error] }))
	}
}
impl IntoResponse for GraphqlResponse {
	fn into_response(self) -> Response {
		(self.status, Json(self.body)).into_response()
	}
}

fn decode_object(
	raw: &str,
	param: &'static str,
) -> Result<Option<Map<String, Value>>, GraphqlRequestError> {
	if raw.trim().is_empty() {
		return Ok(None);
	}

	match serde_json::from_str::<Value>(raw) {
		Ok(Value::Object(map)) => Ok(Some(map)),
		Ok(Value::Null) => Ok(None),
		Ok(_) => Err(GraphqlRequestError::InvalidParam { param, source: None }),
		Err(source) => Err(GraphqlRequestError::InvalidParam { param, source: Some(source) }),
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn get_and_post_decode_to_the_same_request() {
		let post = GraphqlRequest::from_json(
			br#"{"query":"query Viewer($n: Int) { viewer { login } }","operationName":"Viewer","variables":{"n":1}}"#,
		)
		.expect("POST body should decode.");
		let get = GraphqlRequest::from_params(GraphqlParams {
			query: Some("query Viewer($n: Int) { viewer { login } }".into()),
			operation_name: Some("Viewer".into()),
			variables: Some(r#"{"n":1}"#.into()),
			extensions: None,
		})
		.expect("GET parameters should decode.");

		assert_eq!(post, get);
		assert_eq!(post.variables.and_then(|vars| vars.get("n").cloned()), Some(json!(1)));
	}

	#[test]
	fn malformed_variables_are_rejected() {
		let err = GraphqlRequest::from_params(GraphqlParams {
			query: Some("{ viewer { login } }".into()),
			variables: Some("[1, 2]".into()),
			..GraphqlParams::default()
		})
		.expect_err("Array variables must be rejected.");

		assert!(matches!(err, GraphqlRequestError::InvalidParam { param: "variables", .. }));
		assert_eq!(err.status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn body_errors_report_the_json_path() {
		let err = GraphqlRequest::from_json(br#"{"query":"{ a }","variables":{"n":1},"operationName":7}"#)
			.expect_err("Numeric operation name must be rejected.");

		assert!(err.to_string().contains("operationName"), "Unexpected message: {err}.");
		assert!(matches!(
			GraphqlRequest::from_json(br#"{"query":"  "}"#),
			Err(GraphqlRequestError::MissingQuery)
		));
	}

	#[test]
	fn execution_errors_use_the_data_null_envelope() {
		let response =
			GraphqlResponse::execution_error("upstream failed", Some(json!({ "status": 502 })));

		assert_eq!(response.status, StatusCode::OK);
		assert_eq!(response.body["data"], Value::Null);
		assert_eq!(response.body["errors"][0]["message"], "upstream failed");
		assert_eq!(response.body["errors"][0]["extensions"]["status"], 502);
	}
}
