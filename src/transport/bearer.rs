//! Static-token transport that presents the caller's credential upstream.

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderValue};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::TransportError,
	transport::{OutboundCall, Transport, TransportFuture},
};

/// Decorator that writes `Authorization: Bearer <token>` on every call before delegating.
///
/// Any authorization header already present on the request is replaced, so the forwarded
/// credential is always the inbound one.
#[derive(Debug)]
pub struct BearerTransport<T = Arc<dyn Transport>> {
	credential: Credential,
	inner: T,
}
impl<T> BearerTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` so each call carries `credential`.
	pub fn new(credential: Credential, inner: T) -> Self {
		Self { credential, inner }
	}

	fn header_value(&self) -> Result<HeaderValue, TransportError> {
		let mut value =
			HeaderValue::from_str(&self.credential.header_value()).map_err(TransportError::request)?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl<T> Transport for BearerTransport<T>
where
	T: Transport,
{
	fn perform(&self, mut call: OutboundCall) -> TransportFuture<'_> {
		Box::pin(async move {
			let value = self.header_value()?;

			call.request.headers_mut().insert(AUTHORIZATION, value);

			self.inner.perform(call).await
		})
	}
}
