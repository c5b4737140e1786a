//! Transport decorator that admits calls through the shared concurrency gate.

// self
use crate::{
	_prelude::*,
	error::TransportError,
	gate::ConcurrencyGate,
	transport::{OutboundCall, Transport, TransportFuture},
};

/// Holds one gate unit for the duration of every delegated call.
///
/// The unit is taken before the inner transport sees the request and released exactly once
/// when the call finishes, fails, or is cancelled. A call cancelled while waiting never
/// reaches the inner transport.
#[derive(Debug)]
pub struct BoundedTransport<T = Arc<dyn Transport>> {
	gate: ConcurrencyGate,
	inner: T,
}
impl<T> BoundedTransport<T>
where
	T: Transport,
{
	/// Wraps `inner` behind `gate`.
	pub fn new(gate: ConcurrencyGate, inner: T) -> Self {
		Self { gate, inner }
	}

	/// Returns the gate this transport admits through.
	pub fn gate(&self) -> &ConcurrencyGate {
		&self.gate
	}
}
impl<T> Transport for BoundedTransport<T>
where
	T: Transport,
{
	fn perform(&self, call: OutboundCall) -> TransportFuture<'_> {
		Box::pin(async move {
			let cancel = call.cancel.clone();
			let _permit = self.gate.acquire(&cancel).await?;

			tokio::select! {
				biased;
				_ = cancel.cancelled() => Err(TransportError::Cancelled),
				result = self.inner.perform(call) => result,
			}
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// self
	use super::*;

	#[derive(Default)]
	struct CountingTransport {
		calls: AtomicUsize,
	}
	impl Transport for CountingTransport {
		fn perform(&self, _call: OutboundCall) -> TransportFuture<'_> {
			self.calls.fetch_add(1, Ordering::SeqCst);

			Box::pin(async {
				Err(TransportError::network(std::io::Error::other("upstream unreachable")))
			})
		}
	}

	fn call(cancel: CancellationToken) -> OutboundCall {
		let url = Url::parse("http://upstream.invalid/").expect("Fixture URL should parse.");

		OutboundCall::new(reqwest::Request::new(reqwest::Method::GET, url), cancel)
	}

	#[tokio::test]
	async fn failed_calls_release_their_unit() {
		let gate = ConcurrencyGate::new(1).expect("Capacity 1 should be valid.");
		let inner = Arc::new(CountingTransport::default());
		let transport = BoundedTransport::new(gate.clone(), inner.clone());

		for _ in 0..3 {
			let err = transport
				.perform(call(CancellationToken::new()))
				.await
				.expect_err("Counting transport always fails.");

			assert!(matches!(err, TransportError::Network { .. }));
		}

		assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
		assert_eq!(gate.available(), 1);
	}

	#[tokio::test]
	async fn cancelled_call_skips_inner_transport() {
		let gate = ConcurrencyGate::new(1).expect("Capacity 1 should be valid.");
		let inner = Arc::new(CountingTransport::default());
		let transport = BoundedTransport::new(gate.clone(), inner.clone());
		let cancel = CancellationToken::new();

		cancel.cancel();

		let err = transport.perform(call(cancel)).await.expect_err("Cancelled call must fail.");

		assert!(matches!(err, TransportError::CapacityWaitCancelled));
		assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
		assert_eq!(gate.available(), 1);
	}
}
