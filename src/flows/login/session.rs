// crates.io
use rand::{Rng, distr::Alphanumeric};
// self
use crate::{_prelude::*, provider::ProviderDescriptor};

const STATE_LEN: usize = 32;

/// Authorization redirect metadata returned by [`Broker::start_authorization`].
///
/// [`Broker::start_authorization`]: crate::flows::Broker::start_authorization
#[derive(Clone, Debug)]
pub struct AuthorizationSession {
	/// Opaque state value that must round-trip via the redirect handler.
	pub state: String,
	/// Redirect URI supplied when constructing the authorize URL.
	pub redirect_uri: Url,
	/// Authorize URL the end-user's browser should be sent to.
	pub authorize_url: Url,
}
impl AuthorizationSession {
	/// Validates the returned `state` parameter after the authorization redirect.
	pub fn validate_state(&self, returned_state: &str) -> Result<()> {
		if returned_state == self.state { Ok(()) } else { Err(Error::StateMismatch) }
	}
}

pub(super) fn build_session(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
) -> AuthorizationSession {
	let state = random_string(STATE_LEN);
	let authorize_url = build_authorize_url(descriptor, client_id, redirect_uri, &state);

	AuthorizationSession { state, redirect_uri: redirect_uri.clone(), authorize_url }
}

fn build_authorize_url(
	descriptor: &ProviderDescriptor,
	client_id: &str,
	redirect_uri: &Url,
	state: &str,
) -> Url {
	let mut url = descriptor.endpoints.authorization.clone();
	let mut pairs = url.query_pairs_mut();

	pairs.append_pair("client_id", client_id);
	pairs.append_pair("response_type", "code");
	pairs.append_pair("approval_prompt", "auto");
	pairs.append_pair("scope", &descriptor.scope_string());
	pairs.append_pair("redirect_uri", redirect_uri.as_str());
	pairs.append_pair("state", state);

	drop(pairs);

	url
}

fn random_string(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn session() -> AuthorizationSession {
		let descriptor =
			ProviderDescriptor::xbox_live().expect("Production descriptor should build.");
		let redirect =
			Url::parse("https://app.example.com/callback").expect("Redirect fixture should parse.");

		build_session(&descriptor, "client-id", &redirect)
	}

	#[test]
	fn authorize_url_carries_client_scope_and_state() {
		let session = session();
		let pairs: HashMap<_, _> = session.authorize_url.query_pairs().into_owned().collect();

		assert_eq!(session.state.len(), STATE_LEN);
		assert_eq!(pairs.get("client_id").map(String::as_str), Some("client-id"));
		assert_eq!(pairs.get("response_type").map(String::as_str), Some("code"));
		assert_eq!(
			pairs.get("scope").map(String::as_str),
			Some("Xboxlive.signin Xboxlive.offline_access")
		);
		assert_eq!(
			pairs.get("redirect_uri").map(String::as_str),
			Some("https://app.example.com/callback")
		);
		assert_eq!(pairs.get("state"), Some(&session.state));
	}

	#[test]
	fn state_validation_errors_on_mismatch() {
		let session = session();

		assert!(session.validate_state(&session.state.clone()).is_ok());

		let err = session.validate_state("other").expect_err("State mismatch should fail.");

		assert!(matches!(err, Error::StateMismatch));
	}

	#[test]
	fn sessions_use_fresh_state() {
		assert_ne!(session().state, session().state);
	}
}
