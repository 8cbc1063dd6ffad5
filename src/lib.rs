//! Xbox Live credential broker: runs the OAuth, user token, XSTS, and Spartan delegation chain
//! and keeps the derived credential fresh across a session. The profile fetched at the end of
//! the chain is handed to exactly one consumer.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

/// Emits a `tracing` event when the `tracing` feature is enabled; expands to nothing otherwise.
macro_rules! flow_event {
	($level:ident, $($arg:tt)+) => {
		#[cfg(feature = "tracing")]
		{
			tracing::$level!($($arg)+);
		}
	};
}

pub mod auth;
pub mod config;
pub mod error;
pub mod exchange;
pub mod flows;
pub mod http;
pub mod obs;
pub mod provider;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		exchange::{ReqwestTransportErrorMapper, XboxExchangeClient},
		flows::Broker,
		http::ReqwestHttpClient,
		provider::ProviderDescriptor,
		store::{CredentialStore, MemoryProfileCache, MemoryStore, ProfileCache},
	};

	/// Exchange client type alias used by reqwest-backed integration tests.
	pub type ReqwestTestExchangeClient =
		XboxExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Redirect URI registered by every test broker.
	pub const TEST_REDIRECT_URI: &str = "https://app.example.com/callback";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.timeout(std::time::Duration::from_secs(5))
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds the reqwest-backed exchange client pointed at the provided descriptor.
	pub fn build_reqwest_test_exchange(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> ReqwestTestExchangeClient {
		let redirect_uri =
			Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse successfully.");

		XboxExchangeClient::new(
			descriptor,
			client_id,
			client_secret,
			redirect_uri,
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.expect("Test exchange client should build successfully.")
	}

	/// Constructs a [`Broker`] backed by in-memory stores and the reqwest transport used across
	/// integration tests.
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
	) -> (Broker, Arc<MemoryStore>, Arc<MemoryProfileCache>) {
		let credentials_backend = Arc::new(MemoryStore::default());
		let profiles_backend = Arc::new(MemoryProfileCache::default());
		let credentials: Arc<dyn CredentialStore> = credentials_backend.clone();
		let profiles: Arc<dyn ProfileCache> = profiles_backend.clone();
		let exchange = build_reqwest_test_exchange(descriptor.clone(), client_id, client_secret);
		let redirect_uri =
			Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse successfully.");
		let broker = Broker::new(
			Arc::new(exchange),
			credentials,
			profiles,
			descriptor,
			client_id,
			redirect_uri,
		);

		(broker, credentials_backend, profiles_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
