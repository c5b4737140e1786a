//! Observability helpers for outbound calls.
//!
//! # Feature Flags
//!
//! - Spans are always emitted: every outbound call runs inside a span named
//!   `graphql_upstream_proxy.outbound` with `method`, `host` and `authenticated` fields.
//! - Enable `metrics` to increment the `graphql_upstream_proxy_outbound_total` counter for every
//!   call, labeled by `outcome`, and to publish the `graphql_upstream_proxy_gate_in_flight`
//!   gauge.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::{_prelude::*, error::TransportError};

/// Outcome labels recorded for each outbound call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// A response was received, whatever its status.
	Response,
	/// The call was cancelled before or during dispatch.
	Cancelled,
	/// The call failed without a response.
	Failure,
}
impl CallOutcome {
	/// Classifies the result of an outbound call.
	pub fn of<T>(result: &Result<T, TransportError>) -> Self {
		match result {
			Ok(_) => Self::Response,
			Err(e) if e.is_cancelled() => Self::Cancelled,
			Err(_) => Self::Failure,
		}
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Response => "response",
			CallOutcome::Cancelled => "cancelled",
			CallOutcome::Failure => "failure",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
