//! Listener ownership, connection serving, and bounded graceful shutdown.

// std
use std::io::ErrorKind;
// crates.io
use axum::Router;
use hyper_util::{
	rt::{TokioExecutor, TokioIo},
	server::conn::auto,
	service::TowerToHyperService,
};
use tokio::{
	net::{TcpListener, TcpStream},
	task::JoinSet,
};
// self
use crate::{
	_prelude::*,
	auth::TokenExtractor,
	config::GatewayConfig,
	gate::ConcurrencyGate,
	graphql::GraphqlExecutor,
	handler::{self, AppState},
	lifecycle::{Lifecycle, LifecycleState},
	transport::ReqwestTransport,
};

/// How the drain phase ended. Neither outcome is an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShutdownOutcome {
	/// Every in-flight connection finished within the timeout.
	Drained,
	/// The timeout elapsed and the remaining connections were closed.
	TimedOut {
		/// Connections closed by force.
		remaining: usize,
	},
}

/// Bound gateway server, ready to [`run`](Self::run).
#[derive(Debug)]
pub struct Server {
	listener: TcpListener,
	local_addr: SocketAddr,
	router: Router,
	gate: ConcurrencyGate,
	abort: CancellationToken,
	lifecycle: Lifecycle,
	shutdown_timeout: Duration,
}
impl Server {
	/// Validates `config`, builds the shared gate and transport, and binds the listener.
	///
	/// Any startup failure (invalid configuration, HTTP client construction, or
	/// [`Error::Bind`]) is logged and moves the lifecycle to `Stopped`.
	pub async fn bind(
		config: &GatewayConfig,
		executor: Arc<dyn GraphqlExecutor>,
		lifecycle: Lifecycle,
	) -> Result<Self> {
		match Self::start(config, executor, lifecycle.clone()).await {
			Ok(server) => Ok(server),
			Err(e) => {
				tracing::error!(addr = %config.addr, error = %e, "Gateway failed to start.");

				if let Err(rejected) = lifecycle.advance(LifecycleState::Stopped) {
					tracing::debug!(error = %rejected, "Lifecycle was already stopped.");
				}

				Err(e)
			},
		}
	}

	async fn start(
		config: &GatewayConfig,
		executor: Arc<dyn GraphqlExecutor>,
		lifecycle: Lifecycle,
	) -> Result<Self> {
		config.validate()?;

		let gate = ConcurrencyGate::new(config.max_concurrency)?;
		let http = ReqwestTransport::with_user_agent(&config.user_agent)?;
		let state = AppState::new(TokenExtractor::new(http), gate.clone(), executor, config);
		let listener = TcpListener::bind(config.addr)
			.await
			.map_err(|source| Error::Bind { addr: config.addr, source })?;
		let local_addr =
			listener.local_addr().map_err(|source| Error::Bind { addr: config.addr, source })?;

		tracing::info!(
			addr = %local_addr,
			endpoint = %config.endpoint,
			max_concurrency = gate.capacity(),
			shutdown_timeout_ms = config.shutdown_timeout.as_millis() as u64,
			"Gateway listening."
		);

		Ok(Self {
			listener,
			local_addr,
			abort: state.abort_token(),
			router: handler::router(state),
			gate,
			lifecycle,
			shutdown_timeout: config.shutdown_timeout,
		})
	}

	/// Address the listener is bound to.
	pub fn local_addr(&self) -> SocketAddr {
		self.local_addr
	}

	/// Gate shared by every outbound call this server makes.
	pub fn gate(&self) -> &ConcurrencyGate {
		&self.gate
	}

	/// Serves until shutdown is triggered, then drains for at most the shutdown timeout.
	///
	/// Returns the drain outcome. Failed accepts are retried with a capped backoff; only an
	/// error showing the listener itself is unusable ends serving early, and even then
	/// in-flight connections are drained before it is returned.
	pub async fn run(self) -> Result<ShutdownOutcome> {
		let Self { listener, router, gate, abort, lifecycle, shutdown_timeout, .. } = self;

		lifecycle.advance(LifecycleState::Running)?;

		let shutdown = lifecycle.shutdown_token();
		let mut connections = JoinSet::new();
		let mut backoff = AcceptBackoff::default();
		let served = loop {
			tokio::select! {
				biased;
				_ = shutdown.cancelled() => break Ok(()),
				accepted = listener.accept() => match accepted {
					Ok((stream, peer)) => {
						backoff.reset();
						connections.spawn(serve_connection(
							stream,
							peer,
							router.clone(),
							shutdown.clone(),
						));
					},
					Err(e) => match AcceptFailure::classify(&e) {
						AcceptFailure::Connection => {
							tracing::debug!(error = %e, "Discarded connection that failed during accept.");
						},
						AcceptFailure::Transient => {
							let delay = backoff.next_delay();

							tracing::warn!(
								error = %e,
								retry_in_ms = delay.as_millis() as u64,
								"Accepting connections failed; retrying."
							);
							tokio::select! {
								_ = shutdown.cancelled() => {},
								_ = tokio::time::sleep(delay) => {},
							}
						},
						AcceptFailure::Fatal => {
							tracing::error!(error = %e, "Listener is no longer usable.");

							break Err(Error::Serve(e));
						},
					},
				},
				Some(joined) = connections.join_next(), if !connections.is_empty() => {
					if let Err(e) = joined {
						tracing::error!(error = %e, "Connection task failed.");
					}
				},
			}
		};

		drop(listener);
		lifecycle.trigger_shutdown();
		lifecycle.advance(LifecycleState::ShuttingDown)?;

		tracing::info!(
			active_connections = connections.len(),
			timeout_ms = shutdown_timeout.as_millis() as u64,
			"Stopped accepting connections; draining."
		);

		let outcome = drain(&mut connections, &abort, shutdown_timeout).await;

		gate.close();
		lifecycle.advance(LifecycleState::Stopped)?;
		served?;

		Ok(outcome)
	}
}

/// Binds and runs in one step.
pub async fn serve(
	config: &GatewayConfig,
	executor: Arc<dyn GraphqlExecutor>,
	lifecycle: Lifecycle,
) -> Result<ShutdownOutcome> {
	Server::bind(config, executor, lifecycle).await?.run().await
}

async fn serve_connection(
	stream: TcpStream,
	peer: SocketAddr,
	router: Router,
	shutdown: CancellationToken,
) {
	let builder = auto::Builder::new(TokioExecutor::new());
	let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(router));

	tokio::pin!(conn);

	let result = tokio::select! {
		result = conn.as_mut() => result,
		_ = shutdown.cancelled() => {
			conn.as_mut().graceful_shutdown();

			conn.await
		},
	};

	if let Err(e) = result {
		tracing::debug!(peer = %peer, error = %e, "Connection closed with an error.");
	}
}

async fn drain(
	connections: &mut JoinSet<()>,
	abort: &CancellationToken,
	timeout: Duration,
) -> ShutdownOutcome {
	let drained = tokio::time::timeout(timeout, async {
		while connections.join_next().await.is_some() {}
	})
	.await;

	if drained.is_ok() {
		tracing::info!("All connections drained.");

		return ShutdownOutcome::Drained;
	}

	let remaining = connections.len();

	tracing::warn!(
		remaining,
		timeout_ms = timeout.as_millis() as u64,
		"Shutdown timeout elapsed; closing remaining connections."
	);
	// HTTP/2 streams run outside the connection task, so cancel their outbound calls too.
	abort.cancel();
	connections.abort_all();

	while connections.join_next().await.is_some() {}

	ShutdownOutcome::TimedOut { remaining }
}

/// How the accept loop reacts to a failed `accept`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum AcceptFailure {
	/// The peer went away before the connection was handed over; skip it.
	Connection,
	/// Resource exhaustion (`EMFILE`, `ENFILE`, `ENOBUFS`) and other per-accept failures;
	/// back off and retry.
	Transient,
	/// The listening socket itself is unusable.
	Fatal,
}
impl AcceptFailure {
	fn classify(e: &std::io::Error) -> Self {
		match e.kind() {
			ErrorKind::ConnectionRefused
			| ErrorKind::ConnectionAborted
			| ErrorKind::ConnectionReset
			| ErrorKind::Interrupted
			| ErrorKind::WouldBlock => Self::Connection,
			ErrorKind::InvalidInput | ErrorKind::NotConnected | ErrorKind::Unsupported => Self::Fatal,
			_ => Self::Transient,
		}
	}
}

/// Doubling retry delay for transient accept failures, reset by the next successful accept.
#[derive(Debug, Default)]
struct AcceptBackoff {
	current: Option<Duration>,
}
impl AcceptBackoff {
	const INITIAL: Duration = Duration::from_millis(5);
	const MAX: Duration = Duration::from_secs(1);

	fn next_delay(&mut self) -> Duration {
		let delay = match self.current {
			Some(previous) => (previous * 2).min(Self::MAX),
			None => Self::INITIAL,
		};

		self.current = Some(delay);

		delay
	}

	fn reset(&mut self) {
		self.current = None;
	}
}
