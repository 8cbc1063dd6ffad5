// self
use crate::{
	_prelude::*,
	provider::{ProviderDescriptor, ProviderEndpoints},
};

const AUTHORIZATION_ENDPOINT: &str = "https://login.live.com/oauth20_authorize.srf";
const TOKEN_ENDPOINT: &str = "https://login.live.com/oauth20_token.srf";
const USER_AUTHENTICATE_ENDPOINT: &str = "https://user.auth.xboxlive.com/user/authenticate";
const XSTS_AUTHORIZE_ENDPOINT: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
const SPARTAN_TOKEN_ENDPOINT: &str = "https://settings.svc.halowaypoint.com/spartan-token";
const PROFILE_ENDPOINT: &str = "https://profile.svc.halowaypoint.com/users/me";
const SCOPES: [&str; 2] = ["Xboxlive.signin", "Xboxlive.offline_access"];
const USER_RELYING_PARTY: &str = "http://auth.xboxlive.com";
const XSTS_RELYING_PARTY: &str = "https://prod.xsts.halowaypoint.com/";
const SANDBOX_ID: &str = "RETAIL";
const CONTRACT_VERSION: &str = "1";
const SPARTAN_AUDIENCE: &str = "urn:343:s3:services";
const SPARTAN_MIN_VERSION: &str = "4";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum ProviderDescriptorError {
	/// An endpoint could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// An endpoint uses a scheme other than HTTP(S).
	#[error("The {endpoint} endpoint must use HTTP(S): {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// At least one scope must be requested.
	#[error("Descriptor must request at least one scope.")]
	NoScopes,
	/// A textual field was left blank.
	#[error("Descriptor field `{field}` cannot be empty.")]
	EmptyField {
		/// Name of the blank field.
		field: &'static str,
	},
}

/// Builder for [`ProviderDescriptor`] values.
///
/// Every field starts at the production value; override only what differs.
#[derive(Debug, Default)]
pub struct ProviderDescriptorBuilder {
	authorization_endpoint: Option<Url>,
	token_endpoint: Option<Url>,
	user_authenticate_endpoint: Option<Url>,
	xsts_authorize_endpoint: Option<Url>,
	spartan_token_endpoint: Option<Url>,
	profile_endpoint: Option<Url>,
	scopes: Option<Vec<String>>,
	xsts_relying_party: Option<String>,
	sandbox_id: Option<String>,
}
impl ProviderDescriptorBuilder {
	/// Sets the authorize endpoint.
	pub fn authorization_endpoint(mut self, url: Url) -> Self {
		self.authorization_endpoint = Some(url);

		self
	}

	/// Sets the OAuth token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the user-token endpoint.
	pub fn user_authenticate_endpoint(mut self, url: Url) -> Self {
		self.user_authenticate_endpoint = Some(url);

		self
	}

	/// Sets the XSTS authorization endpoint.
	pub fn xsts_authorize_endpoint(mut self, url: Url) -> Self {
		self.xsts_authorize_endpoint = Some(url);

		self
	}

	/// Sets the Spartan token endpoint.
	pub fn spartan_token_endpoint(mut self, url: Url) -> Self {
		self.spartan_token_endpoint = Some(url);

		self
	}

	/// Sets the profile endpoint.
	pub fn profile_endpoint(mut self, url: Url) -> Self {
		self.profile_endpoint = Some(url);

		self
	}

	/// Replaces the requested scopes.
	pub fn scopes<I, S>(mut self, scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.scopes = Some(scopes.into_iter().map(Into::into).collect());

		self
	}

	/// Overrides the XSTS relying party.
	pub fn xsts_relying_party(mut self, relying_party: impl Into<String>) -> Self {
		self.xsts_relying_party = Some(relying_party.into());

		self
	}

	/// Overrides the XSTS sandbox.
	pub fn sandbox_id(mut self, sandbox_id: impl Into<String>) -> Self {
		self.sandbox_id = Some(sandbox_id.into());

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let endpoints = ProviderEndpoints {
			authorization: endpoint_or_default(
				"authorization",
				self.authorization_endpoint,
				AUTHORIZATION_ENDPOINT,
			)?,
			token: endpoint_or_default("token", self.token_endpoint, TOKEN_ENDPOINT)?,
			user_authenticate: endpoint_or_default(
				"user_authenticate",
				self.user_authenticate_endpoint,
				USER_AUTHENTICATE_ENDPOINT,
			)?,
			xsts_authorize: endpoint_or_default(
				"xsts_authorize",
				self.xsts_authorize_endpoint,
				XSTS_AUTHORIZE_ENDPOINT,
			)?,
			spartan_token: endpoint_or_default(
				"spartan_token",
				self.spartan_token_endpoint,
				SPARTAN_TOKEN_ENDPOINT,
			)?,
			profile: endpoint_or_default("profile", self.profile_endpoint, PROFILE_ENDPOINT)?,
		};
		let descriptor = ProviderDescriptor {
			endpoints,
			scopes: self
				.scopes
				.unwrap_or_else(|| SCOPES.iter().map(|scope| (*scope).to_owned()).collect()),
			user_relying_party: USER_RELYING_PARTY.into(),
			xsts_relying_party: self.xsts_relying_party.unwrap_or_else(|| XSTS_RELYING_PARTY.into()),
			sandbox_id: self.sandbox_id.unwrap_or_else(|| SANDBOX_ID.into()),
			contract_version: CONTRACT_VERSION.into(),
			spartan_audience: SPARTAN_AUDIENCE.into(),
			spartan_min_version: SPARTAN_MIN_VERSION.into(),
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if self.scopes.iter().all(|scope| scope.trim().is_empty()) {
			return Err(ProviderDescriptorError::NoScopes);
		}

		validate_field("xsts_relying_party", &self.xsts_relying_party)?;
		validate_field("sandbox_id", &self.sandbox_id)?;

		Ok(())
	}
}

fn endpoint_or_default(
	name: &'static str,
	url: Option<Url>,
	default: &'static str,
) -> Result<Url, ProviderDescriptorError> {
	let url = match url {
		Some(url) => url,
		None => Url::parse(default)
			.map_err(|source| ProviderDescriptorError::InvalidEndpoint { endpoint: name, source })?,
	};

	if matches!(url.scheme(), "https" | "http") {
		Ok(url)
	} else {
		Err(ProviderDescriptorError::UnsupportedScheme { endpoint: name, url: url.to_string() })
	}
}

fn validate_field(name: &'static str, value: &str) -> Result<(), ProviderDescriptorError> {
	if value.trim().is_empty() {
		Err(ProviderDescriptorError::EmptyField { field: name })
	} else {
		Ok(())
	}
}
