//! Fixed-capacity concurrency gate shared by every outbound call in the process.

// crates.io
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
	obs,
};

/// Counting admission gate with capacity fixed at construction.
///
/// Clones share the same units. At any instant the number of outstanding
/// [`GatePermit`]s is at most [`capacity`](Self::capacity). Waiters are not served in any
/// promised order.
#[derive(Clone)]
pub struct ConcurrencyGate {
	semaphore: Arc<Semaphore>,
	capacity: usize,
}
impl ConcurrencyGate {
	/// Creates a gate with `capacity` units.
	pub fn new(capacity: usize) -> Result<Self, ConfigError> {
		if capacity == 0 {
			return Err(ConfigError::ZeroCapacity);
		}

		let capacity = capacity.min(Semaphore::MAX_PERMITS);

		Ok(Self { semaphore: Arc::new(Semaphore::new(capacity)), capacity })
	}

	/// Total number of units.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Units currently free.
	pub fn available(&self) -> usize {
		self.semaphore.available_permits()
	}

	/// Units currently held by in-flight calls.
	pub fn in_flight(&self) -> usize {
		self.capacity.saturating_sub(self.available())
	}

	/// Waits for one unit, giving up as soon as `cancel` fires.
	///
	/// A call whose token is already cancelled never obtains a unit, even if one is free.
	pub async fn acquire(&self, cancel: &CancellationToken) -> Result<GatePermit, TransportError> {
		let permit = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(TransportError::CapacityWaitCancelled),
			permit = Arc::clone(&self.semaphore).acquire_owned() =>
				permit.map_err(|_| TransportError::GateClosed)?,
		};

		Ok(GatePermit::new(permit, self.clone()))
	}

	/// Closes the gate; pending and future acquisitions fail with
	/// [`TransportError::GateClosed`]. Held permits stay valid until dropped.
	pub fn close(&self) {
		self.semaphore.close();
	}

	/// Returns `true` once [`close`](Self::close) has been called.
	pub fn is_closed(&self) -> bool {
		self.semaphore.is_closed()
	}
}
impl Debug for ConcurrencyGate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConcurrencyGate")
			.field("capacity", &self.capacity)
			.field("in_flight", &self.in_flight())
			.finish()
	}
}

/// One held unit; dropping it releases the unit exactly once.
pub struct GatePermit {
	permit: Option<OwnedSemaphorePermit>,
	gate: ConcurrencyGate,
}
impl GatePermit {
	fn new(permit: OwnedSemaphorePermit, gate: ConcurrencyGate) -> Self {
		obs::record_gate_in_flight(gate.in_flight());

		Self { permit: Some(permit), gate }
	}
}
impl Drop for GatePermit {
	fn drop(&mut self) {
		drop(self.permit.take());
		obs::record_gate_in_flight(self.gate.in_flight());
	}
}
impl Debug for GatePermit {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("GatePermit(..)")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn zero_capacity_is_rejected() {
		assert!(matches!(ConcurrencyGate::new(0), Err(ConfigError::ZeroCapacity)));
	}

	#[tokio::test]
	async fn views_stay_consistent_while_permits_are_held() {
		let gate = ConcurrencyGate::new(2).expect("Capacity 2 should be valid.");
		let cancel = CancellationToken::new();
		let first = gate.acquire(&cancel).await.expect("First unit should be free.");

		assert_eq!((gate.in_flight(), gate.available()), (1, 1));

		let second = gate.acquire(&cancel).await.expect("Second unit should be free.");

		assert_eq!((gate.in_flight(), gate.available()), (2, 0));

		drop(first);
		drop(second);

		assert_eq!(gate.in_flight() + gate.available(), gate.capacity());
		assert_eq!(gate.in_flight(), 0);
	}

	#[tokio::test]
	async fn cancelled_token_never_acquires_even_when_free() {
		let gate = ConcurrencyGate::new(1).expect("Capacity 1 should be valid.");
		let cancel = CancellationToken::new();

		cancel.cancel();

		let err = gate.acquire(&cancel).await.expect_err("Cancelled token must not acquire.");

		assert!(matches!(err, TransportError::CapacityWaitCancelled));
		assert_eq!(gate.available(), 1);
	}

	#[tokio::test]
	async fn waiter_wakes_on_cancellation() {
		let gate = ConcurrencyGate::new(1).expect("Capacity 1 should be valid.");
		let _held = gate.acquire(&CancellationToken::new()).await.expect("Unit should be free.");
		let cancel = CancellationToken::new();
		let waiter = {
			let gate = gate.clone();
			let cancel = cancel.clone();

			tokio::spawn(async move { gate.acquire(&cancel).await.map(drop) })
		};

		tokio::task::yield_now().await;
		cancel.cancel();

		let result = tokio::time::timeout(Duration::from_secs(1), waiter)
			.await
			.expect("Cancelled waiter should wake promptly.")
			.expect("Waiter task should not panic.");

		assert!(matches!(result, Err(TransportError::CapacityWaitCancelled)));
		assert_eq!(gate.in_flight(), 1);
	}

	#[tokio::test]
	async fn closed_gate_rejects_acquisition() {
		let gate = ConcurrencyGate::new(1).expect("Capacity 1 should be valid.");

		gate.close();

		let err = gate
			.acquire(&CancellationToken::new())
			.await
			.expect_err("Closed gate must reject acquisition.");

		assert!(gate.is_closed());
		assert!(matches!(err, TransportError::GateClosed));
	}
}
