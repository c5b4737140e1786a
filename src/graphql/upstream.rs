//! Built-in executor that relays documents to an upstream GraphQL endpoint.

// crates.io
use reqwest::header::{ACCEPT, HeaderValue};
use serde_json::{Value, json};
// self
use crate::{
	_prelude::*,
	client::OutboundClient,
	error::TransportError,
	graphql::{ExecutorFuture, GraphqlExecutor, GraphqlRequest, GraphqlResponse},
};

/// Sends each request verbatim as a JSON `POST` to a fixed upstream URL.
///
/// A successful upstream JSON document is relayed unchanged. Transport failures and non-2xx
/// statuses become execution errors in the `{"data": null, "errors": [...]}` envelope; the
/// upstream status and body travel in the error's `extensions`.
#[derive(Clone, Debug)]
pub struct UpstreamGraphqlExecutor {
	url: Url,
}
impl UpstreamGraphqlExecutor {
	/// Relays to `url`.
	pub fn new(url: Url) -> Self {
		Self { url }
	}

	/// Upstream URL requests are sent to.
	pub fn url(&self) -> &Url {
		&self.url
	}

	async fn relay(&self, request: GraphqlRequest, client: OutboundClient) -> GraphqlResponse {
		let builder = client
			.post(self.url.clone())
			.header(ACCEPT, HeaderValue::from_static("application/json"))
			.json(&request);
		let response = match client.send(builder).await {
			Ok(response) => response,
			Err(e) => return transport_failure(&e),
		};
		let status = response.status();
		let body = match response.bytes().await {
			Ok(body) => body,
			Err(e) => return transport_failure(&TransportError::from(e)),
		};
		let document = serde_json::from_slice::<Value>(&body);

		match document {
			Ok(document) if status.is_success() => GraphqlResponse::ok(document),
			Ok(document) => GraphqlResponse::execution_error(
				format!("Upstream responded with status {}.", status.as_u16()),
				Some(json!({ "status": status.as_u16(), "body": document })),
			),
			Err(_) => GraphqlResponse::execution_error(
				format!("Upstream responded with a non-JSON body (status {}).", status.as_u16()),
				Some(json!({ "status": status.as_u16() })),
			),
		}
	}
}
impl GraphqlExecutor for UpstreamGraphqlExecutor {
	fn execute(&self, request: GraphqlRequest, client: OutboundClient) -> ExecutorFuture<'_> {
		Box::pin(self.relay(request, client))
	}
}

fn transport_failure(error: &TransportError) -> GraphqlResponse {
	let code = if error.is_cancelled() { "CANCELLED" } else { "UPSTREAM_UNAVAILABLE" };

	tracing::warn!(error = %error, code, "Upstream call failed.");

	GraphqlResponse::execution_error(error.to_string(), Some(json!({ "code": code })))
}
