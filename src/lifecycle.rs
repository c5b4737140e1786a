//! Process lifecycle: state machine, shutdown trigger, and OS signal listener.
//!
//! ```text
//! Starting → Running → ShuttingDown → Stopped
//! ```
//!
//! The entry point owns one [`Lifecycle`] and hands clones to the server. Tests call
//! [`Lifecycle::trigger_shutdown`] instead of raising real signals.

// crates.io
use tokio::task::JoinHandle;
// self
use crate::_prelude::*;

/// Lifecycle state; transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
	/// Binding the listener.
	Starting,
	/// Accepting connections.
	Running,
	/// No longer accepting; draining in-flight connections.
	ShuttingDown,
	/// Drain finished or timed out.
	Stopped,
}
impl LifecycleState {
	/// Returns a stable label suitable for log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			LifecycleState::Starting => "starting",
			LifecycleState::Running => "running",
			LifecycleState::ShuttingDown => "shutting_down",
			LifecycleState::Stopped => "stopped",
		}
	}
}
impl Display for LifecycleState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Rejected state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ThisError)]
#[error("Lifecycle cannot move from {from} to {to}.")]
pub struct LifecycleError {
	/// State at the time of the attempt.
	pub from: LifecycleState,
	/// Requested state.
	pub to: LifecycleState,
}

/// Shared handle over the process lifecycle.
#[derive(Clone, Debug)]
pub struct Lifecycle {
	state: Arc<RwLock<LifecycleState>>,
	shutdown: CancellationToken,
}
impl Lifecycle {
	/// Creates a lifecycle in [`LifecycleState::Starting`].
	pub fn new() -> Self {
		Self {
			state: Arc::new(RwLock::new(LifecycleState::Starting)),
			shutdown: CancellationToken::new(),
		}
	}

	/// Current state.
	pub fn state(&self) -> LifecycleState {
		*self.state.read()
	}

	/// Moves to `next`, returning the previous state.
	///
	/// Forward moves may skip states (a failed bind goes straight to `Stopped`); moving
	/// backwards or staying put is rejected and leaves the state unchanged.
	pub fn advance(&self, next: LifecycleState) -> Result<LifecycleState, LifecycleError> {
		let mut state = self.state.write();
		let current = *state;

		if next <= current {
			return Err(LifecycleError { from: current, to: next });
		}

		*state = next;

		tracing::debug!(from = %current, to = %next, "Lifecycle advanced.");

		Ok(current)
	}

	/// Requests a graceful shutdown. Idempotent.
	pub fn trigger_shutdown(&self) {
		self.shutdown.cancel();
	}

	/// Returns `true` once shutdown has been requested.
	pub fn is_shutdown_triggered(&self) -> bool {
		self.shutdown.is_cancelled()
	}

	/// Resolves once shutdown has been requested.
	pub async fn shutdown_triggered(&self) {
		self.shutdown.cancelled().await;
	}

	/// Token cancelled when shutdown is requested.
	pub fn shutdown_token(&self) -> CancellationToken {
		self.shutdown.clone()
	}

	/// Spawns a task that triggers shutdown on SIGINT or SIGTERM (Ctrl-C elsewhere).
	///
	/// Handlers are registered before this returns, so a signal delivered afterwards always
	/// reaches the lifecycle. The task exits quietly if shutdown is triggered by other means
	/// first. Must be called from within a tokio runtime.
	pub fn listen_for_signals(&self) -> JoinHandle<()> {
		let lifecycle = self.clone();
		let signals = TerminationSignals::install();

		tokio::spawn(async move {
			let mut signals = match signals {
				Ok(signals) => signals,
				Err(e) => {
					tracing::error!(error = %e, "Failed to install signal handlers.");

					return;
				},
			};

			tokio::select! {
				signal = signals.recv() => match signal {
					Ok(name) => {
						tracing::info!(signal = name, "Termination signal received; shutting down.");
						lifecycle.trigger_shutdown();
					},
					Err(e) => tracing::error!(error = %e, "Signal listener failed."),
				},
				_ = lifecycle.shutdown_triggered() => {},
			}
		})
	}
}
impl Default for Lifecycle {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(unix)]
struct TerminationSignals {
	interrupt: tokio::signal::unix::Signal,
	terminate: tokio::signal::unix::Signal,
}
#[cfg(unix)]
impl TerminationSignals {
	fn install() -> std::io::Result<Self> {
		// crates.io
		use tokio::signal::unix::{SignalKind, signal};

		Ok(Self { interrupt: signal(SignalKind::interrupt())?, terminate: signal(SignalKind::terminate())? })
	}

	async fn recv(&mut self) -> std::io::Result<&'static str> {
		tokio::select! {
			_ = self.interrupt.recv() => Ok("SIGINT"),
			_ = self.terminate.recv() => Ok("SIGTERM"),
		}
	}
}

#[cfg(not(unix))]
struct TerminationSignals;
#[cfg(not(unix))]
impl TerminationSignals {
	fn install() -> std::io::Result<Self> {
		Ok(Self)
	}

	async fn recv(&mut self) -> std::io::Result<&'static str> {
		tokio::signal::ctrl_c().await?;

		Ok("ctrl_c")
	}
}
