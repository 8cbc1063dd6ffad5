//! Production [`ExchangeClient`] for Xbox Live and Halo Waypoint.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, ProfileRecord, TokenSecret},
	error::{ConfigError, ExchangeError, ExchangeFailure, ProviderError},
	exchange::{
		DerivedGrant, ExchangeClient, ExchangeFuture, Hop, OAuthTokens, TransportErrorMapper,
		UserToken,
		oauth::{self, ConfiguredBasicClient},
		wire::{
			ProfileResponse, SpartanProof, SpartanTokenRequest, SpartanTokenResponse,
			UserTokenProperties, UserTokenRequest, XboxTokenResponse, XstsProperties, XstsRequest,
		},
	},
	http::{ResponseMetadataSlot, TokenHttpClient},
	provider::ProviderDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

const CONTRACT_VERSION_HEADER: &str = "x-xbl-contract-version";
const SPARTAN_HEADER: &str = "x-343-authorization-spartan";
const JSON: &str = "application/json";
const BODY_PREVIEW_LIMIT: usize = 256;

/// [`XboxExchangeClient`] over the default reqwest transport.
#[cfg(feature = "reqwest")]
pub type ReqwestExchangeClient = XboxExchangeClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Performs every hop of the delegation chain against the endpoints in a [`ProviderDescriptor`].
///
/// The client holds no per-user state; one instance serves every concurrent request.
pub struct XboxExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	descriptor: ProviderDescriptor,
	oauth_client: ConfiguredBasicClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> XboxExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Builds a client for a confidential application registered with `redirect_uri`.
	pub fn new(
		descriptor: ProviderDescriptor,
		client_id: &str,
		client_secret: &str,
		redirect_uri: Url,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self, ConfigError> {
		let oauth_client =
			oauth::build_oauth_client(&descriptor, client_id, client_secret, &redirect_uri)?;

		Ok(Self {
			descriptor,
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}

	/// Returns the descriptor the client was built with.
	pub fn descriptor(&self) -> &ProviderDescriptor {
		&self.descriptor
	}

	async fn request_user_token(&self, access_token: &TokenSecret) -> Result<UserToken, ExchangeError> {
		let hop = Hop::UserToken;
		let body = UserTokenRequest {
			properties: UserTokenProperties {
				auth_method: "RPS",
				site_name: "user.auth.xboxlive.com",
				rps_ticket: format!("d={}", access_token.expose()),
			},
			relying_party: &self.descriptor.user_relying_party,
			token_type: "JWT",
		};
		let request = self.json_post(hop, &self.descriptor.endpoints.user_authenticate, &body, true)?;
		let response: XboxTokenResponse = self.send(hop, request).await?;
		let user_hash = response
			.user_hash()
			.ok_or_else(|| {
				ExchangeError::new(hop, ProviderError::MissingClaim { claim: "DisplayClaims.xui.uhs" })
			})?
			.to_owned();

		Ok(UserToken { token: TokenSecret::new(response.token), user_hash })
	}

	async fn request_xsts_token(&self, user_token: &UserToken) -> Result<TokenSecret, ExchangeError> {
		let hop = Hop::Xsts;
		let body = XstsRequest {
			properties: XstsProperties {
				sandbox_id: &self.descriptor.sandbox_id,
				user_tokens: [user_token.token.expose()],
			},
			relying_party: &self.descriptor.xsts_relying_party,
			token_type: "JWT",
		};
		let request = self.json_post(hop, &self.descriptor.endpoints.xsts_authorize, &body, true)?;
		let response: XboxTokenResponse = self.send(hop, request).await?;

		if response.token.is_empty() {
			return Err(ExchangeError::new(hop, ProviderError::MissingClaim { claim: "Token" }));
		}

		Ok(TokenSecret::new(response.token))
	}

	async fn request_spartan_token(
		&self,
		xsts_token: &TokenSecret,
	) -> Result<SpartanTokenResponse, ExchangeError> {
		let hop = Hop::Spartan;
		let body = SpartanTokenRequest {
			audience: &self.descriptor.spartan_audience,
			min_version: &self.descriptor.spartan_min_version,
			proof: [SpartanProof { token: xsts_token.expose(), token_type: "Xbox_XSTSv3" }],
		};
		let request = self.json_post(hop, &self.descriptor.endpoints.spartan_token, &body, false)?;
		let response: SpartanTokenResponse = self.send(hop, request).await?;

		if response.spartan_token.is_empty() {
			return Err(ExchangeError::new(hop, ProviderError::MissingClaim { claim: "SpartanToken" }));
		}

		Ok(response)
	}

	async fn request_profile(&self, grant: &DerivedGrant) -> Result<ProfileRecord, ExchangeError> {
		let hop = Hop::Profile;
		let request = Request::builder()
			.method(Method::GET)
			.uri(self.descriptor.endpoints.profile.as_str())
			.header(ACCEPT, JSON)
			.header(SPARTAN_HEADER, grant.credential.expose())
			.body(Vec::new())
			.map_err(|e| ExchangeError::new(hop, ExchangeFailure::invalid_request(e)))?;
		let response: ProfileResponse = self.send(hop, request).await?;

		Ok(ProfileRecord {
			gamertag: response.gamertag,
			xuid: response.xuid,
			credential: grant.credential.clone(),
			xbl_authorization: grant.xbl_authorization.clone(),
		})
	}

	fn json_post<B>(
		&self,
		hop: Hop,
		endpoint: &Url,
		body: &B,
		contract_versioned: bool,
	) -> Result<HttpRequest, ExchangeError>
	where
		B: Serialize,
	{
		let payload = serde_json::to_vec(body)
			.map_err(|e| ExchangeError::new(hop, ExchangeFailure::invalid_request(e)))?;
		let mut builder = Request::builder()
			.method(Method::POST)
			.uri(endpoint.as_str())
			.header(CONTENT_TYPE, JSON)
			.header(ACCEPT, JSON);

		if contract_versioned {
			builder = builder.header(CONTRACT_VERSION_HEADER, self.descriptor.contract_version.as_str());
		}

		builder.body(payload).map_err(|e| ExchangeError::new(hop, ExchangeFailure::invalid_request(e)))
	}

	async fn send<T>(&self, hop: Hop, request: HttpRequest) -> Result<T, ExchangeError>
	where
		T: DeserializeOwned,
	{
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.with_metadata(meta.clone());
		let response = instrumented.call(request).await.map_err(|err| {
			ExchangeError::new(
				hop,
				self.error_mapper.map_transport_error(hop, meta.take().as_ref(), err),
			)
		})?;
		let status = response.status();

		if !status.is_success() {
			flow_event!(debug, %hop, status = status.as_u16(), "provider rejected the exchange");

			return Err(ExchangeError::new(
				hop,
				ProviderError::Status {
					status: status.as_u16(),
					body_preview: body_preview(response.body()),
				},
			));
		}

		parse_json(hop, response.body(), Some(status.as_u16()))
	}
}
impl<C, M> Debug for XboxExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
		f.debug_struct("XboxExchangeClient")
			.field("descriptor", &self.descriptor)
			.field("client_id", self.oauth_client.client_id())
			.finish_non_exhaustive()
	}
}
impl<C, M> ExchangeClient for XboxExchangeClient<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_authorization_code<'a>(
		&'a self,
		code: &'a str,
	) -> ExchangeFuture<'a, OAuthTokens> {
		Box::pin(async move {
			oauth::exchange_code(
				&self.oauth_client,
				self.http_client.as_ref(),
				self.error_mapper.as_ref(),
				&self.descriptor,
				code,
			)
			.await
		})
	}

	fn exchange_refresh_token<'a>(
		&'a self,
		refresh_token: &'a str,
	) -> ExchangeFuture<'a, OAuthTokens> {
		Box::pin(async move {
			oauth::exchange_refresh_token(
				&self.oauth_client,
				self.http_client.as_ref(),
				self.error_mapper.as_ref(),
				&self.descriptor,
				refresh_token,
			)
			.await
		})
	}

	fn exchange_for_user_token<'a>(
		&'a self,
		access_token: &'a TokenSecret,
	) -> ExchangeFuture<'a, UserToken> {
		Box::pin(self.request_user_token(access_token))
	}

	fn exchange_for_derived_credential<'a>(
		&'a self,
		user_token: &'a UserToken,
	) -> ExchangeFuture<'a, DerivedGrant> {
		Box::pin(async move {
			let xsts_token = self.request_xsts_token(user_token).await?;
			let spartan = self.request_spartan_token(&xsts_token).await?;
			let provider_reported_expiry = spartan.expires_at();

			Ok(DerivedGrant {
				credential: DerivedCredential::new(spartan.spartan_token),
				xbl_authorization: TokenSecret::new(format!(
					"XBL3.0 x={};{}",
					user_token.user_hash,
					xsts_token.expose()
				)),
				provider_reported_expiry,
			})
		})
	}

	fn fetch_profile<'a>(&'a self, grant: &'a DerivedGrant) -> ExchangeFuture<'a, ProfileRecord> {
		Box::pin(self.request_profile(grant))
	}
}

fn parse_json<T>(hop: Hop, body: &[u8], status: Option<u16>) -> Result<T, ExchangeError>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ExchangeError::new(hop, ProviderError::ResponseParse { source, status }))
}

fn body_preview(body: &[u8]) -> String {
	let text = String::from_utf8_lossy(body);

	match text.char_indices().nth(BODY_PREVIEW_LIMIT) {
		Some((cut, _)) => format!("{}…", &text[..cut]),
		None => text.into_owned(),
	}
}
