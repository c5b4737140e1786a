//! Validated runtime configuration.

// self
use crate::{_prelude::*, error::ConfigError};

/// Path of the liveness route; reserved so the GraphQL endpoint cannot shadow it.
pub const HEALTH_PATH: &str = "/healthz";

/// Everything the gateway needs to bind, admit, and forward.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
	/// Address the listener binds.
	pub addr: SocketAddr,
	/// Upper bound on the graceful shutdown drain.
	pub shutdown_timeout: Duration,
	/// Capacity of the outbound concurrency gate.
	pub max_concurrency: usize,
	/// Path of the GraphQL endpoint.
	pub endpoint: String,
	/// Upstream GraphQL endpoint used by the built-in executor.
	pub upstream_url: Url,
	/// Optional bound on one inbound request, outbound calls included.
	pub request_timeout: Option<Duration>,
	/// `User-Agent` presented upstream.
	pub user_agent: String,
}
impl GatewayConfig {
	/// Default listening address.
	pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
	/// Default GraphQL endpoint path.
	pub const DEFAULT_ENDPOINT: &str = "/query";
	/// Default graceful shutdown timeout.
	pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
	/// Default upstream GraphQL endpoint.
	pub const DEFAULT_UPSTREAM_URL: &str = "https://api.github.com/graphql";

	/// Creates a configuration bound to `addr` with every other field defaulted.
	pub fn new(addr: SocketAddr) -> Self {
		Self {
			addr,
			shutdown_timeout: Self::DEFAULT_SHUTDOWN_TIMEOUT,
			max_concurrency: default_concurrency(),
			endpoint: Self::DEFAULT_ENDPOINT.into(),
			upstream_url: Url::parse(Self::DEFAULT_UPSTREAM_URL)
				.expect("Default upstream URL must be valid."),
			request_timeout: None,
			user_agent: default_user_agent(),
		}
	}

	/// Overrides the graceful shutdown timeout.
	pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
		self.shutdown_timeout = timeout;

		self
	}

	/// Overrides the gate capacity.
	pub fn with_max_concurrency(mut self, capacity: usize) -> Self {
		self.max_concurrency = capacity;

		self
	}

	/// Overrides the GraphQL endpoint path.
	pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
		self.endpoint = endpoint.into();

		self
	}

	/// Overrides the upstream GraphQL endpoint.
	pub fn with_upstream_url(mut self, url: Url) -> Self {
		self.upstream_url = url;

		self
	}

	/// Sets or clears the per-request timeout.
	pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Checks every invariant the server relies on.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.max_concurrency == 0 {
			return Err(ConfigError::ZeroCapacity);
		}
		if self.shutdown_timeout.is_zero() {
			return Err(ConfigError::ZeroShutdownTimeout);
		}
		if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(ConfigError::ZeroRequestTimeout);
		}

		validate_endpoint(&self.endpoint)?;

		match self.upstream_url.scheme() {
			"http" | "https" => Ok(()),
			other => Err(ConfigError::UnsupportedUpstreamScheme { scheme: other.into() }),
		}
	}
}
impl Default for GatewayConfig {
	fn default() -> Self {
		Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
	}
}

/// Number of available processing units, falling back to 1 when it cannot be determined.
pub fn default_concurrency() -> usize {
	std::thread::available_parallelism().map(usize::from).unwrap_or(1)
}

/// `User-Agent` presented upstream unless overridden.
pub fn default_user_agent() -> String {
	concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into()
}

fn validate_endpoint(path: &str) -> Result<(), ConfigError> {
	let reason = if !path.starts_with('/') {
		"it must start with `/`"
	} else if path == "/" {
		"`/` serves the entry page"
	} else if path == HEALTH_PATH {
		"`/healthz` is reserved for liveness checks"
	} else if path.contains(['?', '#', ' ']) {
		"it must be a plain path"
	} else {
		return Ok(());
	};

	Err(ConfigError::InvalidEndpoint { path: path.into(), reason })
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn defaults_are_valid() {
		let config = GatewayConfig::default();

		config.validate().expect("Default configuration should validate.");

		assert_eq!(config.endpoint, "/query");
		assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
		assert!(config.max_concurrency >= 1);
	}

	#[test]
	fn invalid_fields_are_rejected() {
		let base = GatewayConfig::default();

		assert!(matches!(
			base.clone().with_max_concurrency(0).validate(),
			Err(ConfigError::ZeroCapacity)
		));
		assert!(matches!(
			base.clone().with_shutdown_timeout(Duration::ZERO).validate(),
			Err(ConfigError::ZeroShutdownTimeout)
		));
		assert!(matches!(
			base.clone().with_request_timeout(Some(Duration::ZERO)).validate(),
			Err(ConfigError::ZeroRequestTimeout)
		));

		for endpoint in ["query", "/", "/healthz", "/q?x=1"] {
			assert!(
				matches!(
					base.clone().with_endpoint(endpoint).validate(),
					Err(ConfigError::InvalidEndpoint { .. })
				),
				"Endpoint {endpoint:?} should be rejected."
			);
		}

		let ftp = Url::parse("ftp://example.com/graphql").expect("Fixture URL should parse.");

		assert!(matches!(
			base.with_upstream_url(ftp).validate(),
			Err(ConfigError::UnsupportedUpstreamScheme { .. })
		));
	}
}
