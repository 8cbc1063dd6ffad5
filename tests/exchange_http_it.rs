#![cfg(feature = "reqwest")]

// crates.io
use httpmock::prelude::*;
// self
use xbl_broker::{
	_preludet::*,
	auth::{DerivedCredential, TokenSecret},
	error::{ExchangeFailure, ProviderError, TransportError},
	exchange::{ExchangeClient, Hop, ReqwestTransportErrorMapper, UserToken, XboxExchangeClient},
	flows::{Broker, CredentialCheck},
	http::ReqwestHttpClient,
	provider::ProviderDescriptor,
	store::{MemoryProfileCache, MemoryStore},
};

const CLIENT_ID: &str = "client-xbl";
const CLIENT_SECRET: &str = "secret-xbl";
const HOST: &str = "https://halo.example.com";

fn build_descriptor(server: &MockServer) -> ProviderDescriptor {
	let url = |path: &str| {
		Url::parse(&server.url(path)).expect("Mock endpoint should parse successfully.")
	};

	ProviderDescriptor::builder()
		.authorization_endpoint(url("/oauth20_authorize.srf"))
		.token_endpoint(url("/oauth20_token.srf"))
		.user_authenticate_endpoint(url("/user/authenticate"))
		.xsts_authorize_endpoint(url("/xsts/authorize"))
		.spartan_token_endpoint(url("/spartan-token"))
		.profile_endpoint(url("/users/me"))
		.build()
		.expect("Mock descriptor should build successfully.")
}

async fn mock_token<'a>(server: &'a MockServer, refresh_token: &str) -> httpmock::Mock<'a> {
	let body = format!(
		"{{\"access_token\":\"access-1\",\"refresh_token\":\"{refresh_token}\",\"token_type\":\"bearer\",\"expires_in\":3600,\"scope\":\"Xboxlive.signin Xboxlive.offline_access\"}}"
	);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/oauth20_token.srf");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mock_user_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/user/authenticate")
				.header("x-xbl-contract-version", "1")
				.header("content-type", "application/json");
			then.status(200).header("content-type", "application/json").body(
				"{\"IssueInstant\":\"2025-11-10T12:00:00Z\",\"Token\":\"user-token\",\"DisplayClaims\":{\"xui\":[{\"uhs\":\"hash-1\"}]}}",
			);
		})
		.await
}

async fn mock_xsts(server: &MockServer, status: u16) -> httpmock::Mock<'_> {
	server
		.mock_async(move |when, then| {
			when.method(POST).path("/xsts/authorize").header("x-xbl-contract-version", "1");

			if status == 200 {
				then.status(200).header("content-type", "application/json").body(
					"{\"Token\":\"xsts-token\",\"DisplayClaims\":{\"xui\":[{\"uhs\":\"hash-1\"}]}}",
				);
			} else {
				then.status(status).body("{\"XErr\":2148916233}");
			}
		})
		.await
}

async fn mock_spartan<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let body = format!(
		"{{\"SpartanToken\":\"{token}\",\"ExpiresUtc\":{{\"ISO8601Date\":\"2025-11-10T16:00:00Z\"}},\"TokenDuration\":\"PT4H\"}}"
	);

	server
		.mock_async(move |when, then| {
			when.method(POST).path("/spartan-token");
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

async fn mock_profile<'a>(server: &'a MockServer, token: &str) -> httpmock::Mock<'a> {
	let token = token.to_owned();

	server
		.mock_async(move |when, then| {
			when.method(GET).path("/users/me").header("x-343-authorization-spartan", token);
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"xuid\":\"2533274800000000\",\"gamertag\":\"Master Chief\"}");
		})
		.await
}

#[tokio::test]
async fn login_runs_every_hop_and_stores_the_result() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, store, profiles) =
		build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let token = mock_token(&server, "refresh-1").await;
	let user = mock_user_token(&server).await;
	let xsts = mock_xsts(&server, 200).await;
	let spartan = mock_spartan(&server, "spartan-1").await;
	let profile = mock_profile(&server, "spartan-1").await;
	let login = broker.complete_login("auth-code").await.expect("Login should succeed.");

	token.assert_async().await;
	user.assert_async().await;
	xsts.assert_async().await;
	spartan.assert_async().await;
	profile.assert_async().await;

	assert_eq!(login.credential.expose(), "spartan-1");
	assert_eq!(login.record.refresh_token.expose(), "refresh-1");
	assert_eq!(login.record.derived_expiry - login.record.issued_at, Duration::hours(1));
	assert!(store.contains("spartan-1"));
	assert!(profiles.contains("spartan-1"));

	let host = Url::parse(HOST).expect("Host fixture should parse.");

	assert_eq!(login.redirect_url(&host).as_str(), "https://halo.example.com/?token=spartan-1");

	let handed_off = broker
		.take_profile(&login.credential)
		.await
		.expect("Profile lookup should succeed.")
		.expect("Profile should be pending after login.");

	assert_eq!(handed_off.gamertag, "Master Chief");
	assert_eq!(handed_off.xbl_authorization.expose(), "XBL3.0 x=hash-1;xsts-token");

	let check =
		broker.check_credential(&login.credential).await.expect("Lifecycle check should succeed.");

	assert_eq!(check, CredentialCheck::Valid(login.credential.clone()));
}

#[tokio::test]
async fn rejected_xsts_hop_is_reported_and_nothing_is_stored() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, store, profiles) =
		build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let _token = mock_token(&server, "refresh-1").await;
	let _user = mock_user_token(&server).await;
	let xsts = mock_xsts(&server, 401).await;
	let spartan = mock_spartan(&server, "spartan-1").await;
	let err = broker.complete_login("auth-code").await.expect_err("Login should fail.");

	xsts.assert_async().await;
	spartan.assert_calls_async(0).await;

	assert_eq!(err.hop(), Some(Hop::Xsts));
	assert!(err.is_provider());
	assert!(store.is_empty());
	assert!(profiles.is_empty());
}

#[tokio::test]
async fn oauth_error_responses_surface_the_provider_code() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let (broker, _, _) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let token = server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth20_token.srf");
			then.status(400).header("content-type", "application/json").body(
				"{\"error\":\"invalid_grant\",\"error_description\":\"The provided value for the 'code' parameter is not valid.\"}",
			);
		})
		.await;
	let err = broker.complete_login("stale-code").await.expect_err("Login should fail.");

	token.assert_async().await;

	assert_eq!(err.hop(), Some(Hop::OAuth));

	match err {
		Error::Exchange(exchange) => match exchange.failure {
			ExchangeFailure::Provider(ProviderError::OAuth { error, status, .. }) => {
				assert_eq!(error, "invalid_grant");
				assert_eq!(status, Some(400));
			},
			other => panic!("Unexpected failure: {other:?}."),
		},
		other => panic!("Unexpected error: {other:?}."),
	}
}

#[tokio::test]
async fn missing_user_hash_is_a_provider_error() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let exchange = build_reqwest_test_exchange(descriptor, CLIENT_ID, CLIENT_SECRET);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/user/authenticate");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"Token\":\"user-token\",\"DisplayClaims\":{\"xui\":[]}}");
		})
		.await;
	let err = exchange
		.exchange_for_user_token(&TokenSecret::new("access-1"))
		.await
		.expect_err("Missing user hash should be rejected.");

	mock.assert_async().await;

	assert_eq!(err.hop, Hop::UserToken);
	assert!(matches!(err.failure, ExchangeFailure::Provider(ProviderError::MissingClaim { .. })));
}

#[tokio::test]
async fn malformed_spartan_body_reports_the_json_path() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let exchange = build_reqwest_test_exchange(descriptor, CLIENT_ID, CLIENT_SECRET);
	let _xsts = mock_xsts(&server, 200).await;
	let _spartan = server
		.mock_async(|when, then| {
			when.method(POST).path("/spartan-token");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"SpartanToken\":42}");
		})
		.await;
	let user_token =
		UserToken { token: TokenSecret::new("user-token"), user_hash: "hash-1".into() };
	let err = exchange
		.exchange_for_derived_credential(&user_token)
		.await
		.expect_err("Numeric Spartan token should be rejected.");

	assert_eq!(err.hop, Hop::Spartan);

	match err.failure {
		ExchangeFailure::Provider(ProviderError::ResponseParse { source, status }) => {
			assert_eq!(source.path().to_string(), "SpartanToken");
			assert_eq!(status, Some(200));
		},
		other => panic!("Unexpected failure: {other:?}."),
	}
}

#[tokio::test]
async fn derived_credential_reports_provider_expiry() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let exchange = build_reqwest_test_exchange(descriptor, CLIENT_ID, CLIENT_SECRET);
	let _xsts = mock_xsts(&server, 200).await;
	let _spartan = mock_spartan(&server, "spartan-9").await;
	let user_token =
		UserToken { token: TokenSecret::new("user-token"), user_hash: "hash-1".into() };
	let grant = exchange
		.exchange_for_derived_credential(&user_token)
		.await
		.expect("Derived credential exchange should succeed.");

	assert_eq!(grant.credential, DerivedCredential::new("spartan-9"));
	assert_eq!(
		grant.provider_reported_expiry,
		Some(time::macros::datetime!(2025-11-10 16:00 UTC))
	);
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
	let descriptor = ProviderDescriptor::builder()
		.token_endpoint(
			Url::parse("http://127.0.0.1:9/oauth20_token.srf")
				.expect("Unreachable endpoint should parse."),
		)
		.build()
		.expect("Descriptor should build.");
	let (broker, store, _) = build_reqwest_test_broker(descriptor, CLIENT_ID, CLIENT_SECRET);
	let err = broker.complete_login("auth-code").await.expect_err("Login should fail.");

	assert_eq!(err.hop(), Some(Hop::OAuth));
	assert!(err.is_transport());
	assert!(!err.is_provider());
	assert!(store.is_empty());
}

#[tokio::test]
async fn slow_xsts_hop_times_out_as_a_transport_error() {
	let server = MockServer::start_async().await;
	let descriptor = build_descriptor(&server);
	let _token = mock_token(&server, "refresh-1").await;
	let _user = mock_user_token(&server).await;
	let xsts = server
		.mock_async(|when, then| {
			when.method(POST).path("/xsts/authorize");
			then.status(200)
				.delay(std::time::Duration::from_secs(2))
				.header("content-type", "application/json")
				.body("{\"Token\":\"xsts-token\",\"DisplayClaims\":{\"xui\":[{\"uhs\":\"hash-1\"}]}}");
		})
		.await;
	let spartan = mock_spartan(&server, "spartan-1").await;
	let http_client = ReqwestHttpClient::with_timeout(std::time::Duration::from_millis(200))
		.expect("Short-timeout client should build.");
	let exchange: ReqwestTestExchangeClient = XboxExchangeClient::new(
		descriptor.clone(),
		CLIENT_ID,
		CLIENT_SECRET,
		Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse successfully."),
		http_client,
		ReqwestTransportErrorMapper,
	)
	.expect("Exchange client should build.");
	let store = Arc::new(MemoryStore::default());
	let broker = Broker::new(
		Arc::new(exchange),
		store.clone(),
		Arc::new(MemoryProfileCache::default()),
		descriptor,
		CLIENT_ID,
		Url::parse(TEST_REDIRECT_URI).expect("Test redirect URI should parse successfully."),
	);
	let err = broker.complete_login("auth-code").await.expect_err("Login should time out.");

	xsts.assert_async().await;
	spartan.assert_calls_async(0).await;

	assert_eq!(err.hop(), Some(Hop::Xsts));
	assert!(err.is_transport());
	assert!(matches!(
		err,
		Error::Exchange(ref exchange)
			if matches!(exchange.failure, ExchangeFailure::Transport(TransportError::Timeout { .. }))
	));
	assert!(store.is_empty());
}
