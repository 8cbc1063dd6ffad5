//! Lifecycle orchestration: the login flow, the per-request credential check, and the shared
//! delegation chain behind both.

pub mod login;
pub mod refresh;

mod common;

pub use login::*;
pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::DerivedCredential,
	exchange::ExchangeClient,
	provider::ProviderDescriptor,
	store::{CredentialStore, ProfileCache},
};
#[cfg(feature = "reqwest")]
use crate::{
	config::BrokerConfig,
	error::ConfigError,
	exchange::{ReqwestExchangeClient, ReqwestTransportErrorMapper},
	http::ReqwestHttpClient,
	store::{MemoryProfileCache, MemoryStore},
};

/// Manages the lifecycle of derived credentials for a single provider registration.
///
/// The broker owns the exchange client, the credential store, and the profile cache. Every
/// lifecycle decision is made lazily when a caller presents a credential; nothing runs in the
/// background. Cloning is cheap and every clone shares the same stores and singleflight guards.
#[derive(Clone)]
pub struct Broker {
	/// Exchange client that performs each hop of the delegation chain.
	pub exchange: Arc<dyn ExchangeClient>,
	/// Refresh records keyed by derived credential.
	pub credentials: Arc<dyn CredentialStore>,
	/// One-shot profile handoff keyed by derived credential.
	pub profiles: Arc<dyn ProfileCache>,
	/// Provider descriptor that defines endpoints and scopes.
	pub descriptor: ProviderDescriptor,
	/// OAuth client identifier placed on the authorize redirect.
	pub client_id: String,
	/// Redirect URI registered for the client.
	pub redirect_uri: Url,
	/// Shared counters for lifecycle checks.
	pub refresh_metrics: Arc<RefreshMetrics>,
	refresh_window: Duration,
	provider_lifetime: Option<Duration>,
	flow_guards: Arc<Mutex<HashMap<DerivedCredential, common::FlowGuard>>>,
}
impl Broker {
	/// Lead time before the derived expiry at which a credential is refreshed.
	pub const REFRESH_WINDOW: Duration = Duration::minutes(5);

	/// Creates a broker from its collaborators.
	pub fn new(
		exchange: Arc<dyn ExchangeClient>,
		credentials: Arc<dyn CredentialStore>,
		profiles: Arc<dyn ProfileCache>,
		descriptor: ProviderDescriptor,
		client_id: impl Into<String>,
		redirect_uri: Url,
	) -> Self {
		Self {
			exchange,
			credentials,
			profiles,
			descriptor,
			client_id: client_id.into(),
			redirect_uri,
			refresh_metrics: Default::default(),
			refresh_window: Self::REFRESH_WINDOW,
			provider_lifetime: None,
			flow_guards: Default::default(),
		}
	}

	/// Overrides the refresh window; negative values are clamped to zero.
	pub fn with_refresh_window(mut self, window: Duration) -> Self {
		self.refresh_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Bounds the refresh token issued at login to `lifetime` after issuance.
	///
	/// Without this, a fresh login sets the provider expiry equal to the derived expiry.
	/// Refreshes always carry the original provider expiry forward.
	pub fn with_provider_lifetime(mut self, lifetime: Duration) -> Self {
		self.provider_lifetime = Some(lifetime);

		self
	}

	/// Returns the refresh window in effect.
	pub fn refresh_window(&self) -> Duration {
		self.refresh_window
	}
}
#[cfg(feature = "reqwest")]
impl Broker {
	/// Builds a production broker with in-memory stores and the reqwest transport.
	pub fn from_config(config: &BrokerConfig) -> Result<Self> {
		let descriptor = ProviderDescriptor::xbox_live().map_err(ConfigError::from)?;
		let exchange = ReqwestExchangeClient::new(
			descriptor.clone(),
			&config.client_id,
			config.client_secret.expose(),
			config.redirect_uri.clone(),
			ReqwestHttpClient::new()?,
			ReqwestTransportErrorMapper,
		)?;

		Ok(Self::new(
			Arc::new(exchange),
			Arc::new(MemoryStore::default()),
			Arc::new(MemoryProfileCache::default()),
			descriptor,
			config.client_id.clone(),
			config.redirect_uri.clone(),
		))
	}
}
impl Debug for Broker {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("redirect_uri", &self.redirect_uri)
			.field("refresh_window", &self.refresh_window)
			.field("provider_lifetime", &self.provider_lifetime)
			.finish()
	}
}

