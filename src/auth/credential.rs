//! Redacted bearer credential extracted from an inbound request.

// crates.io
use oauth2::AccessToken;
// self
use crate::_prelude::*;

/// Literal scheme prefix recognized on inbound `authorization` headers.
pub const BEARER_PREFIX: &str = "Bearer ";

/// Opaque bearer token forwarded upstream on behalf of the caller.
///
/// The token is never validated; it lives for one inbound request and is only ever exposed
/// when the outbound `Authorization` header is written.
#[derive(Clone)]
pub struct Credential(AccessToken);
impl Credential {
	/// Wraps a token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(AccessToken::new(value.into()))
	}

	/// Parses an `authorization` header value.
	///
	/// Returns `None` unless the value starts with `"Bearer "` followed by a non-empty token.
	pub fn from_authorization(value: &str) -> Option<Self> {
		let token = value.strip_prefix(BEARER_PREFIX)?;

		if token.is_empty() {
			return None;
		}

		Some(Self::new(token))
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		self.0.secret()
	}

	/// Renders the outbound header value, `Bearer <token>`.
	pub fn header_value(&self) -> String {
		format!("{BEARER_PREFIX}{}", self.expose())
	}
}
impl PartialEq for Credential {
	fn eq(&self, other: &Self) -> bool {
		self.expose() == other.expose()
	}
}
impl Eq for Credential {}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("Credential").field(&"<redacted>").finish()
	}
}
impl Display for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn bearer_prefix_yields_remainder_verbatim() {
		let credential = Credential::from_authorization("Bearer 0xdeadbeaf")
			.expect("Bearer header should produce a credential.");

		assert_eq!(credential.expose(), "0xdeadbeaf");
		assert_eq!(credential.header_value(), "Bearer 0xdeadbeaf");
	}

	#[test]
	fn other_schemes_and_empty_tokens_are_anonymous() {
		assert_eq!(Credential::from_authorization("Basic YWRtaW46cGFzcw=="), None);
		assert_eq!(Credential::from_authorization(""), None);
		assert_eq!(Credential::from_authorization("Bearer "), None);
		assert_eq!(Credential::from_authorization("bearer abc"), None);
	}

	#[test]
	fn credential_formatters_redact() {
		let credential = Credential::new("super-secret");

		assert_eq!(format!("{credential:?}"), "Credential(\"<redacted>\")");
		assert_eq!(format!("{credential}"), "<redacted>");
	}
}
