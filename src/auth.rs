//! Inbound credential extraction and per-request outbound client construction.
//!
//! Extraction is fail-open: a missing header, a different scheme, or an empty token all
//! produce an anonymous client rather than rejecting the request. This layer forwards
//! credentials; it never enforces them.

pub mod credential;

pub use credential::*;

// crates.io
use reqwest::header::{AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	client::OutboundClient,
	transport::{BearerTransport, ReqwestTransport, Transport},
};

/// Builds outbound clients that present the caller's bearer credential upstream.
#[derive(Clone, Debug)]
pub struct TokenExtractor {
	http: ReqwestTransport,
}
impl TokenExtractor {
	/// Creates an extractor whose clients ultimately dispatch through `http`.
	pub fn new(http: ReqwestTransport) -> Self {
		Self { http }
	}

	/// Returns the default transport used for anonymous calls.
	pub fn transport(&self) -> &ReqwestTransport {
		&self.http
	}

	/// Builds a client for an inbound `authorization` header value.
	///
	/// With a `"Bearer <token>"` value the client's transport injects the same header on
	/// every outbound call; any other value yields a plain client. The client is bound to
	/// `scope` so cancelling the inbound request cancels its outbound calls.
	pub fn client_for(&self, authorization: &str, scope: CancellationToken) -> OutboundClient {
		let credential = Credential::from_authorization(authorization);
		let authenticated = credential.is_some();
		let transport: Arc<dyn Transport> = match credential {
			Some(credential) => Arc::new(BearerTransport::new(credential, self.http.clone())),
			None => Arc::new(self.http.clone()),
		};

		OutboundClient::new(self.http.client().clone(), transport, scope)
			.with_authenticated(authenticated)
	}

	/// Same as [`client_for`](Self::client_for), reading the header from an inbound map.
	pub fn client_from_headers(
		&self,
		headers: &HeaderMap,
		scope: CancellationToken,
	) -> OutboundClient {
		self.client_for(authorization_header(headers), scope)
	}
}

/// Returns the inbound `authorization` header as a string, or `""` when it is missing or
/// not visible ASCII.
pub fn authorization_header(headers: &HeaderMap) -> &str {
	headers.get(AUTHORIZATION).and_then(|value| value.to_str().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::HeaderValue;
	// self
	use super::*;

	#[test]
	fn missing_or_binary_headers_read_as_empty() {
		let mut headers = HeaderMap::new();

		assert_eq!(authorization_header(&headers), "");

		headers.insert(
			AUTHORIZATION,
			HeaderValue::from_bytes(b"Bearer \xff").expect("Opaque header bytes should be accepted."),
		);

		assert_eq!(authorization_header(&headers), "");
	}

	#[test]
	fn bearer_header_produces_authenticated_client() {
		let extractor = TokenExtractor::new(ReqwestTransport::default());
		let client = extractor.client_for("Bearer abc123", CancellationToken::new());

		assert!(client.is_authenticated());

		let anonymous = extractor.client_for("Basic YWRtaW46cGFzcw==", CancellationToken::new());

		assert!(!anonymous.is_authenticated());
	}
}
