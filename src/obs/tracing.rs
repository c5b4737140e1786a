// crates.io
use tracing_subscriber::EnvFilter;
// self
use crate::_prelude::*;

/// Installs the global `fmt` subscriber, filtered by `RUST_LOG` or `default_filter` when
/// the variable is unset or invalid.
pub fn init_subscriber(default_filter: &str) {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
		)
		.init();
}

/// Span wrapper used for every outbound call.
#[derive(Clone, Debug)]
pub struct CallSpan {
	span: tracing::Span,
}
impl CallSpan {
	/// Creates a span tagged with the request method, upstream host, and whether a credential
	/// is being forwarded.
	pub fn new(method: &str, host: &str, authenticated: bool) -> Self {
		let span = tracing::info_span!(
			"graphql_upstream_proxy.outbound",
			method,
			host,
			authenticated,
			outcome = tracing::field::Empty,
		);

		Self { span }
	}

	/// Records the final outcome on the span.
	pub fn record_outcome(&self, outcome: crate::obs::CallOutcome) {
		self.span.record("outcome", outcome.as_str());
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> tracing::instrument::Instrumented<Fut>
	where
		Fut: Future,
	{
		use tracing::Instrument;

		fut.instrument(self.span.clone())
	}
}
