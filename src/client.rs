//! Per-request outbound client handed to the GraphQL executor.

// crates.io
use reqwest::{Method, Request, RequestBuilder, Response};
// self
use crate::{
	_prelude::*,
	error::TransportError,
	gate::ConcurrencyGate,
	obs::{self, CallOutcome, CallSpan},
	transport::{BoundedTransport, OutboundCall, Transport},
};

/// HTTP client scoped to one inbound request.
///
/// Every call goes through the client's transport chain and carries a child of the inbound
/// request's cancellation token, so ending the inbound request ends all of its outbound
/// calls. Clients are built per request and never shared between requests.
#[derive(Clone, Debug)]
pub struct OutboundClient {
	http: ReqwestClient,
	transport: Arc<dyn Transport>,
	scope: CancellationToken,
	authenticated: bool,
}
impl OutboundClient {
	/// Creates a client that builds requests with `http` and dispatches them via `transport`.
	pub fn new(http: ReqwestClient, transport: Arc<dyn Transport>, scope: CancellationToken) -> Self {
		Self { http, transport, scope, authenticated: false }
	}

	/// Marks whether the transport forwards a caller credential; used for span fields only.
	pub fn with_authenticated(mut self, authenticated: bool) -> Self {
		self.authenticated = authenticated;

		self
	}

	/// Wraps the current transport chain behind `gate`.
	pub fn bounded(mut self, gate: ConcurrencyGate) -> Self {
		self.transport = Arc::new(BoundedTransport::new(gate, self.transport));

		self
	}

	/// Returns `true` when outbound calls carry the caller's bearer credential.
	pub fn is_authenticated(&self) -> bool {
		self.authenticated
	}

	/// Cancellation scope of the inbound request this client serves.
	pub fn scope(&self) -> &CancellationToken {
		&self.scope
	}

	/// Starts building a request; send it with [`send`](Self::send).
	pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
		self.http.request(method, url)
	}

	/// Starts building a `GET` request.
	pub fn get(&self, url: Url) -> RequestBuilder {
		self.request(Method::GET, url)
	}

	/// Starts building a `POST` request.
	pub fn post(&self, url: Url) -> RequestBuilder {
		self.request(Method::POST, url)
	}

	/// Builds and sends a request through the transport chain.
	pub async fn send(&self, builder: RequestBuilder) -> Result<Response, TransportError> {
		let request = builder.build()?;

		self.execute(request).await
	}

	/// Sends a prepared request through the transport chain.
	pub async fn execute(&self, request: Request) -> Result<Response, TransportError> {
		let span = CallSpan::new(
			request.method().as_str(),
			request.url().host_str().unwrap_or_default(),
			self.authenticated,
		);
		let call = OutboundCall::new(request, self.scope.child_token());
		let result = span.instrument(self.transport.perform(call)).await;
		let outcome = CallOutcome::of(&result);

		span.record_outcome(outcome);
		obs::record_call_outcome(outcome);

		if let Err(e) = &result {
			tracing::debug!(error = %e, outcome = %outcome, "Outbound call did not produce a response.");
		}

		result
	}
}
