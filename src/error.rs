//! Broker-level error types shared across the exchange chain, stores, and lifecycle flows.

// self
use crate::{_prelude::*, exchange::Hop};

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// One hop of the delegation chain failed.
	#[error(transparent)]
	Exchange(#[from] ExchangeError),

	/// The upstream refresh token is past its provider expiry; no refresh is possible.
	#[error("Provider refresh token has expired; the session must re-authenticate.")]
	ExpiredRefresh,
	/// No refresh record exists for the presented derived credential.
	#[error("No refresh record exists for the presented credential.")]
	NotFound,
	/// The `state` returned by the authorization redirect does not match the issued one.
	#[error("Authorization state mismatch.")]
	StateMismatch,
}
impl Error {
	/// Returns the chain hop that failed, when the error originated from an exchange.
	pub fn hop(&self) -> Option<Hop> {
		match self {
			Self::Exchange(err) => Some(err.hop),
			_ => None,
		}
	}

	/// Returns `true` for network, DNS, timeout, or I/O failures talking to the provider.
	pub fn is_transport(&self) -> bool {
		matches!(self, Self::Exchange(ExchangeError { failure: ExchangeFailure::Transport(_), .. }))
	}

	/// Returns `true` for non-2xx or malformed provider responses.
	pub fn is_provider(&self) -> bool {
		matches!(self, Self::Exchange(ExchangeError { failure: ExchangeFailure::Provider(_), .. }))
	}

	/// Returns `true` when the caller must restart authentication from an authorization code.
	pub fn requires_reauthentication(&self) -> bool {
		matches!(self, Self::ExpiredRefresh | Self::NotFound)
	}
}

/// Configuration and validation failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},
	/// Provider descriptor failed validation.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// Redirect URI cannot be parsed.
	#[error("Redirect URI is invalid.")]
	InvalidRedirect {
		/// Underlying parsing failure.
		#[source]
		source: oauth2::url::ParseError,
	},

	/// Required configuration key is absent or blank.
	#[error("Required configuration value `{key}` is missing.")]
	MissingValue {
		/// Environment key that was looked up.
		key: &'static str,
	},
	/// Configuration key holds a value that is not a valid URL.
	#[error("Configuration value `{key}` is not a valid URL.")]
	InvalidUrl {
		/// Environment key that was looked up.
		key: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Dotenv file could not be read or parsed.
	#[error("Environment file {path} could not be loaded.")]
	EnvFile {
		/// Path of the dotenv file.
		path: String,
		/// Underlying loader failure.
		#[source]
		source: dotenvy::Error,
	},
	/// Refresh record builder validation failed.
	#[error("Unable to build refresh record.")]
	RecordBuild(#[from] crate::auth::RefreshRecordBuilderError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failure of a single hop of the delegation chain, tagged with the hop identity.
#[derive(Debug, ThisError)]
#[error("The {hop} exchange failed.")]
pub struct ExchangeError {
	/// Hop that failed.
	pub hop: Hop,
	/// Underlying failure.
	#[source]
	pub failure: ExchangeFailure,
}
impl ExchangeError {
	/// Tags a failure with the hop it occurred on.
	pub fn new(hop: Hop, failure: impl Into<ExchangeFailure>) -> Self {
		Self { hop, failure: failure.into() }
	}
}

/// Classification of a hop failure.
#[derive(Debug, ThisError)]
pub enum ExchangeFailure {
	/// Network-level failure talking to the provider.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Provider answered with a non-2xx status or an unusable body.
	#[error(transparent)]
	Provider(#[from] ProviderError),
	/// The outbound request could not be assembled.
	#[error("Request could not be constructed.")]
	InvalidRequest {
		/// Underlying construction failure.
		#[source]
		source: BoxError,
	},
}
impl ExchangeFailure {
	/// Wraps a request construction failure.
	pub fn invalid_request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::InvalidRequest { source: Box::new(src) }
	}
}

/// Provider-side failures (status codes, OAuth errors, malformed payloads).
#[derive(Debug, ThisError)]
pub enum ProviderError {
	/// Provider responded with a non-success status.
	#[error("Provider responded with HTTP {status}: {body_preview}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Truncated response body.
		body_preview: String,
	},
	/// OAuth token endpoint returned a standard error response.
	#[error("Token endpoint returned an OAuth error: {error}.")]
	OAuth {
		/// OAuth `error` field.
		error: String,
		/// OAuth `error_description` field, when present.
		description: Option<String>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider responded with JSON that does not match the expected shape.
	#[error("Provider returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Provider response omitted a claim the chain depends on.
	#[error("Provider response is missing `{claim}`.")]
	MissingClaim {
		/// Dotted path of the missing claim.
		claim: &'static str,
	},
	/// Token endpoint response omitted `expires_in`.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
	/// Token endpoint returned a non-positive duration.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Provider answered in a way the client could not classify.
	#[error("Provider returned an unexpected response: {message}.")]
	Unexpected {
		/// Summary of the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, timeout, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request to the provider timed out.")]
	Timeout {
		/// Transport-specific timeout error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// HTTP client failed without a structured error.
	#[error("HTTP client error occurred while calling the provider: {message}.")]
	Other {
		/// Client-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}

	/// Wraps a transport-specific timeout error.
	pub fn timeout(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Timeout { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::timeout(e) } else { Self::network(e) }
	}
}
