//! Gateway entry point: parse configuration, install logging, serve until a termination
//! signal arrives, then drain.
//!
//! Exit codes: 0 after a drained or timed-out shutdown (and for `--help`/`--version`), 1 for
//! any startup failure, invalid flags and environment values included.

// std
use std::sync::Arc;
// crates.io
use clap::{Parser, error::ErrorKind};
use color_eyre::Result;
// self
use graphql_upstream_proxy::{
	cli::Cli,
	config::GatewayConfig,
	graphql::UpstreamGraphqlExecutor,
	lifecycle::Lifecycle,
	obs,
	server::{Server, ShutdownOutcome},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	obs::init_subscriber("info");

	let Some(config) = load_config()? else {
		return Ok(());
	};
	let lifecycle = Lifecycle::new();
	let signals = lifecycle.listen_for_signals();
	let executor = Arc::new(UpstreamGraphqlExecutor::new(config.upstream_url.clone()));
	let server = Server::bind(&config, executor, lifecycle.clone()).await?;
	let outcome = server.run().await?;

	signals.abort();

	match outcome {
		ShutdownOutcome::Drained => tracing::info!("Gateway stopped."),
		ShutdownOutcome::TimedOut { remaining } =>
			tracing::warn!(remaining, "Gateway stopped after closing connections by force."),
	}

	Ok(())
}

/// Returns `None` when the invocation only asked for help or the version.
fn load_config() -> Result<Option<GatewayConfig>> {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
			e.print()?;

			return Ok(None);
		},
		Err(e) => {
			tracing::error!(kind = ?e.kind(), "Invalid command line or environment.");

			return Err(e.into());
		},
	};

	match cli.into_config() {
		Ok(config) => Ok(Some(config)),
		Err(e) => {
			tracing::error!(error = %e, "Invalid configuration.");

			Err(e.into())
		},
	}
}
