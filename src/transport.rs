//! Outbound transport primitives.
//!
//! [`Transport`] is the gateway's only dependency on an HTTP stack. Decorators hold the
//! transport they wrap and add one concern each: [`BearerTransport`] injects the caller's
//! credential, [`BoundedTransport`] admits the call through the shared
//! [`ConcurrencyGate`](crate::gate::ConcurrencyGate). [`ReqwestTransport`] performs the
//! network call at the bottom of every chain.

pub mod bearer;
pub mod bounded;

pub use bearer::BearerTransport;
pub use bounded::BoundedTransport;

// std
use std::ops::Deref;
// crates.io
use reqwest::{Request, Response};
// self
use crate::{_prelude::*, error::TransportError};

/// Boxed future returned by [`Transport::perform`].
pub type TransportFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Response, TransportError>> + 'a + Send>>;

/// Performs one outbound HTTP call.
///
/// Implementations must be `Send + Sync + 'static` so one instance can sit behind an
/// `Arc<dyn Transport>` in every client of an inbound request. A non-2xx status is a
/// successful `perform`; only failures to obtain a response are errors.
pub trait Transport
where
	Self: 'static + Send + Sync,
{
	/// Sends `call.request`, honoring `call.cancel`.
	fn perform(&self, call: OutboundCall) -> TransportFuture<'_>;
}
impl<T> Transport for Arc<T>
where
	T: ?Sized + Transport,
{
	fn perform(&self, call: OutboundCall) -> TransportFuture<'_> {
		(**self).perform(call)
	}
}

impl Debug for dyn Transport {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("Transport(..)")
	}
}

/// One outbound request and the cancellation token that governs it.
#[derive(Debug)]
pub struct OutboundCall {
	/// Request to dispatch.
	pub request: Request,
	/// Cancelled when the originating inbound request ends.
	pub cancel: CancellationToken,
}
impl OutboundCall {
	/// Pairs a request with its cancellation token.
	pub fn new(request: Request, cancel: CancellationToken) -> Self {
		Self { request, cancel }
	}
}

/// Thin wrapper around [`ReqwestClient`] so the default transport lives in one place.
///
/// Cloning is cheap and shares the connection pool; the pool is the only process-wide
/// piece of the outbound stack besides the gate.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport(ReqwestClient);
impl ReqwestTransport {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client that identifies itself with `user_agent`.
	pub fn with_user_agent(user_agent: &str) -> Result<Self> {
		let client = ReqwestClient::builder()
			.user_agent(user_agent)
			.build()
			.map_err(crate::error::ConfigError::from)?;

		Ok(Self(client))
	}

	/// Returns the wrapped client.
	pub fn client(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestTransport {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
impl Transport for ReqwestTransport {
	fn perform(&self, call: OutboundCall) -> TransportFuture<'_> {
		let client = self.0.clone();

		Box::pin(async move { client.execute(call.request).await.map_err(TransportError::from) })
	}
}
