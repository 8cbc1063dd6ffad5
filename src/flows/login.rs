//! Login flow: the authorize redirect, authorization-code redemption, and the browser redirect
//! that hands the derived credential to the client.

mod session;

pub use session::*;

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, RefreshRecord},
	flows::{
		Broker,
		common::{self, ChainGrant, IssuedCredential},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of a completed login.
#[derive(Clone, Debug)]
pub struct LoginOutcome {
	/// Freshly issued derived credential; also the key of its profile and refresh record.
	pub credential: DerivedCredential,
	/// Refresh record stored for the credential.
	pub record: RefreshRecord,
}
impl LoginOutcome {
	/// Builds the post-login redirect `<host>/?token=<credential>`.
	pub fn redirect_url(&self, host: &Url) -> Url {
		let mut url = host.clone();
		let path = format!("{}/", url.path().trim_end_matches('/'));

		url.set_path(&path);
		url.set_fragment(None);
		url.query_pairs_mut().clear().append_pair("token", self.credential.expose());

		url
	}
}

impl Broker {
	/// Builds the provider authorize URL and a fresh CSRF `state`.
	pub fn start_authorization(&self) -> AuthorizationSession {
		let _span = FlowSpan::new(FlowKind::Login, "start_authorization").entered();

		session::build_session(&self.descriptor, &self.client_id, &self.redirect_uri)
	}

	/// Redeems an authorization code at the current time.
	pub async fn complete_login(&self, code: &str) -> Result<LoginOutcome> {
		self.complete_login_at(code, OffsetDateTime::now_utc()).await
	}

	/// Redeems an authorization code, runs the full chain, and stores the refresh record and
	/// the pending profile under the new derived credential.
	///
	/// Nothing is stored unless every hop succeeds. Failures are returned as-is without retry.
	pub async fn complete_login_at(&self, code: &str, now: OffsetDateTime) -> Result<LoginOutcome> {
		const KIND: FlowKind = FlowKind::Login;

		let span = FlowSpan::new(KIND, "complete_login");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let IssuedCredential { credential, record, profile } =
					common::run_chain(self, ChainGrant::AuthorizationCode(code), now, None).await?;

				self.credentials.put(credential.clone(), record.clone()).await?;

				if let Err(err) = self.profiles.put(credential.clone(), profile).await {
					return Err(common::roll_back_record(self, &credential, err).await);
				}

				flow_event!(info, "login completed");

				Ok(LoginOutcome { credential, record })
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_err) => {
				flow_event!(warn, error = %_err, "login failed");

				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
			},
		}

		result
	}
}
