// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};
// crates.io
use reqwest::{Method, Request, Response};
use tokio_util::sync::CancellationToken;
// self
use graphql_upstream_proxy::{
	error::TransportError,
	gate::ConcurrencyGate,
	transport::{BoundedTransport, OutboundCall, Transport, TransportFuture},
	url::Url,
};

/// Holds every call until `release` fires while tracking how many run at once.
#[derive(Default)]
struct HoldingTransport {
	started: AtomicUsize,
	current: AtomicUsize,
	peak: AtomicUsize,
	release: CancellationToken,
}
impl Transport for HoldingTransport {
	fn perform(&self, _call: OutboundCall) -> TransportFuture<'_> {
		Box::pin(async move {
			let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;

			self.peak.fetch_max(now, Ordering::SeqCst);
			self.started.fetch_add(1, Ordering::SeqCst);
			self.release.cancelled().await;
			self.current.fetch_sub(1, Ordering::SeqCst);

			Ok(Response::from(axum::http::Response::new("")))
		})
	}
}

type Bounded = Arc<BoundedTransport<Arc<HoldingTransport>>>;

fn bounded(capacity: usize) -> (Bounded, Arc<HoldingTransport>, ConcurrencyGate) {
	let gate = ConcurrencyGate::new(capacity).expect("Gate capacity should be valid.");
	let inner = Arc::new(HoldingTransport::default());

	(Arc::new(BoundedTransport::new(gate.clone(), inner.clone())), inner, gate)
}

fn call(cancel: CancellationToken) -> OutboundCall {
	let url = Url::parse("https://upstream.test/graphql").expect("Fixture URL should parse.");

	OutboundCall::new(Request::new(Method::POST, url), cancel)
}

fn spawn_call(
	transport: &Bounded,
	cancel: CancellationToken,
) -> tokio::task::JoinHandle<Result<Response, TransportError>> {
	let transport = transport.clone();

	tokio::spawn(async move { transport.perform(call(cancel)).await })
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
	tokio::time::timeout(Duration::from_secs(2), async {
		while !condition() {
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("Condition should hold before the deadline.");
}

#[tokio::test]
async fn concurrent_calls_never_exceed_capacity() {
	let (transport, inner, gate) = bounded(2);
	let handles = (0..6).map(|_| spawn_call(&transport, CancellationToken::new())).collect::<Vec<_>>();

	wait_until(|| inner.started.load(Ordering::SeqCst) == 2).await;
	tokio::time::sleep(Duration::from_millis(50)).await;

	assert_eq!(inner.started.load(Ordering::SeqCst), 2);
	assert_eq!(gate.in_flight(), 2);

	inner.release.cancel();

	for handle in handles {
		let response = handle
			.await
			.expect("Call task should not panic.")
			.expect("Released call should succeed.");

		assert_eq!(response.status(), 200);
	}

	assert_eq!(inner.started.load(Ordering::SeqCst), 6);
	assert_eq!(inner.peak.load(Ordering::SeqCst), 2);
	assert_eq!(gate.available(), 2);
}

#[tokio::test]
async fn cancelled_waiters_do_not_leak_capacity() {
	let (transport, inner, gate) = bounded(1);
	let holder = spawn_call(&transport, CancellationToken::new());

	wait_until(|| inner.started.load(Ordering::SeqCst) == 1).await;

	let waiters = (0..3)
		.map(|_| {
			let cancel = CancellationToken::new();

			(spawn_call(&transport, cancel.clone()), cancel)
		})
		.collect::<Vec<_>>();

	tokio::time::sleep(Duration::from_millis(20)).await;

	for (handle, cancel) in waiters {
		cancel.cancel();

		let result = handle.await.expect("Waiter task should not panic.");

		assert!(matches!(result, Err(TransportError::CapacityWaitCancelled)));
	}

	assert_eq!(inner.started.load(Ordering::SeqCst), 1);

	inner.release.cancel();
	holder.await.expect("Holder task should not panic.").expect("Holder call should succeed.");

	assert_eq!(gate.available(), 1);

	let fresh = spawn_call(&transport, CancellationToken::new())
		.await
		.expect("Fresh call task should not panic.");

	assert!(fresh.is_ok());
	assert_eq!(inner.started.load(Ordering::SeqCst), 2);
	assert_eq!(gate.available(), 1);
}

#[tokio::test]
async fn cancelling_an_in_flight_call_releases_its_unit() {
	let (transport, inner, gate) = bounded(1);
	let cancel = CancellationToken::new();
	let in_flight = spawn_call(&transport, cancel.clone());

	wait_until(|| inner.started.load(Ordering::SeqCst) == 1).await;

	assert_eq!(gate.available(), 0);

	cancel.cancel();

	let result = in_flight.await.expect("Cancelled call task should not panic.");

	assert!(matches!(result, Err(TransportError::Cancelled)));
	assert_eq!(gate.available(), 1);
}

#[tokio::test]
async fn closed_gate_rejects_new_calls() {
	let (transport, inner, gate) = bounded(1);

	gate.close();

	let result = spawn_call(&transport, CancellationToken::new())
		.await
		.expect("Call task should not panic.");

	assert!(matches!(result, Err(TransportError::GateClosed)));
	assert_eq!(inner.started.load(Ordering::SeqCst), 0);
}
