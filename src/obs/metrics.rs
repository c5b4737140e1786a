// self
use crate::obs::CallOutcome;

/// Records an outbound call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!("graphql_upstream_proxy_outbound_total", "outcome" => outcome.as_str())
			.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = outcome;
	}
}

/// Publishes the number of gate units currently held (when enabled).
pub fn record_gate_in_flight(in_flight: usize) {
	#[cfg(feature = "metrics")]
	{
		metrics::gauge!("graphql_upstream_proxy_gate_in_flight").set(in_flight as f64);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = in_flight;
	}
}
