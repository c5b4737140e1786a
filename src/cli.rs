//! Command line and environment surface.

// crates.io
use clap::Parser;
// self
use crate::{
	_prelude::*,
	config::{self, GatewayConfig},
	error::ConfigError,
};

/// GraphQL gateway forwarding caller bearer tokens to an upstream API.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Listening address; `:PORT` binds every interface.
	#[arg(long, env = "GATEWAY_ADDR", default_value = GatewayConfig::DEFAULT_ADDR, value_parser = parse_addr)]
	pub addr: SocketAddr,

	/// Upper bound on the graceful shutdown drain (e.g. `5s`, `500ms`, `1m 30s`, or bare seconds).
	#[arg(long, env = "GATEWAY_SHUTDOWN_TIMEOUT", default_value = "5s", value_parser = parse_duration)]
	pub shutdown_timeout: Duration,

	/// Maximum number of outbound calls in flight (default: available processing units).
	#[arg(long, env = "GATEWAY_MAX_CONCURRENCY")]
	pub max_concurrency: Option<usize>,

	/// Path of the GraphQL endpoint.
	#[arg(long, env = "GATEWAY_ENDPOINT", default_value = GatewayConfig::DEFAULT_ENDPOINT)]
	pub endpoint: String,

	/// Upstream GraphQL endpoint requests are forwarded to.
	#[arg(long, env = "GATEWAY_UPSTREAM_URL", default_value = GatewayConfig::DEFAULT_UPSTREAM_URL, value_parser = parse_upstream)]
	pub upstream_url: Url,

	/// Optional bound on one inbound request, outbound calls included.
	#[arg(long, env = "GATEWAY_REQUEST_TIMEOUT", value_parser = parse_duration)]
	pub request_timeout: Option<Duration>,

	/// `User-Agent` presented upstream.
	#[arg(long, env = "GATEWAY_USER_AGENT")]
	pub user_agent: Option<String>,
}
impl Cli {
	/// Converts parsed arguments into a validated [`GatewayConfig`].
	pub fn into_config(self) -> Result<GatewayConfig, ConfigError> {
		let mut config = GatewayConfig::new(self.addr)
			.with_shutdown_timeout(self.shutdown_timeout)
			.with_max_concurrency(self.max_concurrency.unwrap_or_else(config::default_concurrency))
			.with_endpoint(self.endpoint)
			.with_upstream_url(self.upstream_url)
			.with_request_timeout(self.request_timeout);

		if let Some(user_agent) = self.user_agent {
			config.user_agent = user_agent;
		}

		config.validate()?;

		Ok(config)
	}
}

/// Parses a listening address, accepting the `:PORT` shorthand for all interfaces.
pub fn parse_addr(value: &str) -> Result<SocketAddr, ConfigError> {
	let raw = value.trim();
	let expanded = if raw.starts_with(':') { format!("0.0.0.0{raw}") } else { raw.to_owned() };

	expanded
		.parse()
		.map_err(|source| ConfigError::InvalidAddr { value: value.to_owned(), source })
}

/// Parses a humantime duration (`500ms`, `5s`, `1m 30s`, `2h`) or a bare number of seconds.
pub fn parse_duration(value: &str) -> Result<Duration, ConfigError> {
	let raw = value.trim();

	if let Ok(secs) = raw.parse::<u64>() {
		return Ok(Duration::from_secs(secs));
	}

	humantime::parse_duration(raw)
		.map_err(|source| ConfigError::InvalidDuration { value: value.to_owned(), source })
}

/// Parses the upstream URL.
pub fn parse_upstream(value: &str) -> Result<Url, ConfigError> {
	Url::parse(value.trim()).map_err(|source| ConfigError::InvalidUpstream { source })
}
