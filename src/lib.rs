//! GraphQL gateway that forwards each caller's bearer token to an upstream API while a
//! process-wide concurrency gate bounds how many outbound calls are in flight.
//!
//! The crate owns the transport pipeline and the server lifecycle; GraphQL execution is
//! delegated to a [`graphql::GraphqlExecutor`] that receives a per-request
//! [`client::OutboundClient`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod gate;
pub mod graphql;
pub mod handler;
pub mod lifecycle;
pub mod obs;
pub mod server;
pub mod transport;

// Used by the binary target only.
use color_eyre as _;
#[cfg(test)]
use {base64 as _, httpmock as _};

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		net::SocketAddr,
		pin::Pin,
		sync::Arc,
		time::Duration,
	};

	pub use parking_lot::RwLock;
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use tokio_util::sync::CancellationToken;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
