//! Gateway-level error types shared across the transport, configuration, and server layers.

// self
use crate::_prelude::*;

/// Gateway-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical gateway error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Lifecycle misuse, such as running a server on a stopped lifecycle.
	#[error(transparent)]
	Lifecycle(#[from] crate::lifecycle::LifecycleError),
	/// Outbound call failure.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The listening socket could not be bound.
	#[error("Failed to bind the listening address {addr}.")]
	Bind {
		/// Address the server attempted to bind.
		addr: SocketAddr,
		/// Underlying socket failure.
		#[source]
		source: std::io::Error,
	},
	/// Serving failed for a reason other than an orderly shutdown.
	#[error("Server failed while accepting connections.")]
	Serve(#[source] std::io::Error),
}

/// Configuration and validation failures raised at startup.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Outbound HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// Listening address cannot be parsed.
	#[error("Listening address `{value}` is invalid.")]
	InvalidAddr {
		/// Raw address string.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: std::net::AddrParseError,
	},
	/// Upstream URL cannot be parsed.
	#[error("Upstream URL is invalid.")]
	InvalidUpstream {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Upstream URL uses a scheme other than http(s).
	#[error("Upstream URL scheme `{scheme}` is not supported.")]
	UnsupportedUpstreamScheme {
		/// Offending scheme.
		scheme: String,
	},
	/// Duration string cannot be parsed.
	#[error("Duration `{value}` is invalid; expected bare seconds or a value such as `500ms` or `1m 30s`.")]
	InvalidDuration {
		/// Raw duration string.
		value: String,
		/// Underlying parsing failure.
		#[source]
		source: humantime::DurationError,
	},

	/// Concurrency gate capacity must be positive.
	#[error("The outbound concurrency capacity must be at least 1.")]
	ZeroCapacity,
	/// Shutdown timeout must be positive.
	#[error("The graceful shutdown timeout must be positive.")]
	ZeroShutdownTimeout,
	/// Request timeout, when set, must be positive.
	#[error("The request timeout must be positive when set.")]
	ZeroRequestTimeout,
	/// GraphQL endpoint path is unusable.
	#[error("GraphQL endpoint `{path}` is invalid: {reason}.")]
	InvalidEndpoint {
		/// Offending path.
		path: String,
		/// Why the path was rejected.
		reason: &'static str,
	},
}
impl ConfigError {
	/// Wraps a transport builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures surfaced by outbound transports.
///
/// Non-2xx upstream responses are not errors at this layer; the response is returned as-is
/// and interpreting it belongs to the executor.
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The call was cancelled before a concurrency unit became available.
	#[error("Request cancelled while waiting for outbound capacity.")]
	CapacityWaitCancelled,
	/// The inbound request ended while the outbound call was in flight.
	#[error("Request cancelled while the outbound call was in flight.")]
	Cancelled,
	/// The concurrency gate was closed.
	#[error("The outbound concurrency gate is closed.")]
	GateClosed,
	/// The outbound request could not be constructed.
	#[error("Outbound request could not be constructed.")]
	Request {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a request construction failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}

	/// Returns `true` when the failure came from cancellation rather than the network.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::CapacityWaitCancelled | Self::Cancelled)
	}
}
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_builder() { Self::request(e) } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn capacity_wait_cancellation_is_distinguishable() {
		let err = TransportError::CapacityWaitCancelled;

		assert!(err.is_cancelled());
		assert_eq!(err.to_string(), "Request cancelled while waiting for outbound capacity.");

		let gateway_error: Error = err.into();

		assert!(matches!(
			gateway_error,
			Error::Transport(TransportError::CapacityWaitCancelled)
		));
	}

	#[test]
	fn bind_error_exposes_socket_failure_as_source() {
		let addr: SocketAddr = "127.0.0.1:8080".parse().expect("Fixture address should parse.");
		let err = Error::Bind {
			addr,
			source: std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use"),
		};

		assert!(err.to_string().contains("127.0.0.1:8080"));

		let source = StdError::source(&err).expect("Bind error should expose its socket source.");

		assert_eq!(source.to_string(), "address in use");
	}

	#[test]
	fn network_errors_are_not_cancellations() {
		let err = TransportError::network(std::io::Error::other("connection reset"));

		assert!(!err.is_cancelled());
	}
}
