//! `oauth2` crate glue for the first hop: client construction, grant submission, and error
//! mapping.

// crates.io
use oauth2::{
	AuthType, AuthUrl, AuthorizationCode, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RedirectUrl, RefreshToken, RequestTokenError, Scope, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError, BasicTokenResponse},
};
// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	error::{ConfigError, ExchangeError, ProviderError},
	exchange::{Hop, OAuthTokens, TransportErrorMapper},
	http::{ResponseMetadata, ResponseMetadataSlot, TokenHttpClient},
	provider::ProviderDescriptor,
};

pub(crate) type ConfiguredBasicClient =
	BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Confidential client that posts its secret in the request body.
pub(crate) fn build_oauth_client(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	client_secret: &str,
	redirect_uri: &Url,
) -> Result<ConfiguredBasicClient, ConfigError> {
	let auth_url = AuthUrl::new(descriptor.endpoints.authorization.to_string())
		.map_err(|source| ConfigError::InvalidDescriptor { source })?;
	let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
		.map_err(|source| ConfigError::InvalidDescriptor { source })?;
	let redirect_url = RedirectUrl::new(redirect_uri.to_string())
		.map_err(|source| ConfigError::InvalidRedirect { source })?;

	Ok(BasicClient::new(ClientId::new(client_id.to_owned()))
		.set_client_secret(ClientSecret::new(client_secret.to_owned()))
		.set_auth_uri(auth_url)
		.set_token_uri(token_url)
		.set_redirect_uri(redirect_url)
		.set_auth_type(AuthType::RequestBody))
}

pub(crate) async fn exchange_code<C, M>(
	oauth_client: &ConfiguredBasicClient,
	http_client: &C,
	error_mapper: &M,
	descriptor: &ProviderDescriptor,
	code: &str,
) -> Result<OAuthTokens, ExchangeError>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let meta = ResponseMetadataSlot::default();
	let instrumented = http_client.with_metadata(meta.clone());
	let response = oauth_client
		.exchange_code(AuthorizationCode::new(code.to_owned()))
		.add_extra_param("scope", descriptor.scope_string())
		.request_async(&instrumented)
		.await
		.map_err(|err| map_request_error(meta.take(), err, error_mapper))?;

	map_token_response(response)
}

pub(crate) async fn exchange_refresh_token<C, M>(
	oauth_client: &ConfiguredBasicClient,
	http_client: &C,
	error_mapper: &M,
	descriptor: &ProviderDescriptor,
	refresh_token: &str,
) -> Result<OAuthTokens, ExchangeError>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let meta = ResponseMetadataSlot::default();
	let instrumented = http_client.with_metadata(meta.clone());
	let refresh_secret = RefreshToken::new(refresh_token.to_owned());
	let mut request = oauth_client.exchange_refresh_token(&refresh_secret);

	for scope in &descriptor.scopes {
		request = request.add_scope(Scope::new(scope.to_owned()));
	}

	let response = request
		.request_async(&instrumented)
		.await
		.map_err(|err| map_request_error(meta.take(), err, error_mapper))?;

	map_token_response(response)
}

/// Upper bound on an access-token lifetime; Microsoft issues one hour.
const MAX_EXPIRES_IN_SECS: i64 = 60 * 60 * 24 * 365;

fn map_token_response(response: BasicTokenResponse) -> Result<OAuthTokens, ExchangeError> {
	let fail = |err: ProviderError| ExchangeError::new(Hop::OAuth, err);
	let expires_in = response.expires_in().ok_or_else(|| fail(ProviderError::MissingExpiresIn))?;
	let expires_in = i64::try_from(expires_in.as_secs())
		.ok()
		.filter(|secs| *secs <= MAX_EXPIRES_IN_SECS)
		.ok_or_else(|| fail(ProviderError::ExpiresInOutOfRange))?;

	if expires_in <= 0 {
		return Err(fail(ProviderError::NonPositiveExpiresIn));
	}

	Ok(OAuthTokens {
		access_token: TokenSecret::new(response.access_token().secret().to_owned()),
		refresh_token: response
			.refresh_token()
			.map(|token| token.secret())
			.filter(|secret| !secret.is_empty())
			.map(|secret| TokenSecret::new(secret.to_owned())),
		expires_in: Duration::seconds(expires_in),
	})
}

fn map_request_error<E, M>(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> ExchangeError
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();
	let status = meta_ref.and_then(|meta| meta.status);

	match err {
		RequestTokenError::ServerResponse(response) =>
			ExchangeError::new(Hop::OAuth, map_server_response_error(response, status)),
		RequestTokenError::Request(error) =>
			ExchangeError::new(Hop::OAuth, mapper.map_transport_error(Hop::OAuth, meta_ref, error)),
		RequestTokenError::Parse(source, _body) =>
			ExchangeError::new(Hop::OAuth, ProviderError::ResponseParse { source, status }),
		RequestTokenError::Other(message) =>
			ExchangeError::new(Hop::OAuth, ProviderError::Unexpected { message, status }),
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> ProviderError {
	ProviderError::OAuth {
		error: response.error().as_ref().to_owned(),
		description: response.error_description().cloned(),
		status,
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn builds_request_body_client() {
		let descriptor =
			ProviderDescriptor::xbox_live().expect("Production descriptor should build.");
		let redirect =
			Url::parse("https://app.example.com/callback").expect("Redirect fixture should parse.");
		let client = build_oauth_client(&descriptor, "client-id", "secret", &redirect)
			.expect("OAuth client should build.");

		assert_eq!(client.client_id().as_str(), "client-id");
		assert_eq!(
			client.redirect_uri().map(|url| url.as_str()),
			Some("https://app.example.com/callback")
		);
	}

	#[test]
	fn token_response_requires_positive_expiry() {
		let response: BasicTokenResponse = serde_json::from_str(
			r#"{"access_token":"access","token_type":"bearer","expires_in":0,"refresh_token":"r"}"#,
		)
		.expect("Token response fixture should deserialize.");
		let err = map_token_response(response).expect_err("Zero lifetime should be rejected.");

		assert_eq!(err.hop, Hop::OAuth);
		assert!(matches!(
			err.failure,
			crate::error::ExchangeFailure::Provider(ProviderError::NonPositiveExpiresIn)
		));

		let response: BasicTokenResponse =
			serde_json::from_str(r#"{"access_token":"access","token_type":"bearer"}"#)
				.expect("Token response fixture should deserialize.");
		let err = map_token_response(response).expect_err("Missing lifetime should be rejected.");

		assert!(matches!(
			err.failure,
			crate::error::ExchangeFailure::Provider(ProviderError::MissingExpiresIn)
		));
	}

	#[test]
	fn token_response_rejects_absurd_lifetimes() {
		let response: BasicTokenResponse = serde_json::from_str(
			r#"{"access_token":"access","token_type":"bearer","expires_in":9000000000000000000}"#,
		)
		.expect("Token response fixture should deserialize.");
		let err = map_token_response(response).expect_err("Huge lifetime should be rejected.");

		assert_eq!(err.hop, Hop::OAuth);
		assert!(matches!(
			err.failure,
			crate::error::ExchangeFailure::Provider(ProviderError::ExpiresInOutOfRange)
		));

		let response: BasicTokenResponse = serde_json::from_str(&format!(
			r#"{{"access_token":"access","token_type":"bearer","expires_in":{MAX_EXPIRES_IN_SECS}}}"#
		))
		.expect("Token response fixture should deserialize.");
		let tokens = map_token_response(response).expect("A one-year lifetime should be accepted.");

		assert_eq!(tokens.expires_in, Duration::days(365));
	}

	#[test]
	fn token_response_keeps_optional_refresh_token() {
		let response: BasicTokenResponse = serde_json::from_str(
			r#"{"access_token":"access","token_type":"bearer","expires_in":3600}"#,
		)
		.expect("Token response fixture should deserialize.");
		let tokens = map_token_response(response).expect("Token response should map.");

		assert_eq!(tokens.access_token.expose(), "access");
		assert!(tokens.refresh_token.is_none());
		assert_eq!(tokens.expires_in, Duration::hours(1));
	}
}
