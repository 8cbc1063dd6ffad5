//! The per-hop exchange contract and its Xbox Live implementation.
//!
//! [`ExchangeClient`] is a stateless translation layer: each call builds one provider request,
//! submits it, and maps a non-2xx or malformed answer to an [`ExchangeError`] tagged with the
//! [`Hop`] that failed. Nothing here retries; retry policy belongs to the broker.

pub mod transport;
pub mod xbox;

mod oauth;
mod wire;

pub use transport::*;
pub use xbox::*;

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, ProfileRecord, TokenSecret},
	error::ExchangeError,
};

/// Boxed future returned by every exchange hop.
pub type ExchangeFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ExchangeError>> + 'a + Send>>;

/// Individual hops of the delegation chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hop {
	/// Authorization code or refresh token → OAuth token pair.
	OAuth,
	/// OAuth access token → Xbox Live user token.
	UserToken,
	/// User token → XSTS token.
	Xsts,
	/// XSTS token → derived (Spartan) credential.
	Spartan,
	/// Derived credential → player profile.
	Profile,
}
impl Hop {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Hop::OAuth => "oauth",
			Hop::UserToken => "user_token",
			Hop::Xsts => "xsts",
			Hop::Spartan => "spartan",
			Hop::Profile => "profile",
		}
	}
}
impl Display for Hop {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// OAuth token pair returned by the authorization code and refresh token grants.
#[derive(Clone, Debug)]
pub struct OAuthTokens {
	/// Short-lived access token presented to the user-token hop.
	pub access_token: TokenSecret,
	/// Refresh token, when the provider issued (or rotated) one.
	pub refresh_token: Option<TokenSecret>,
	/// Provider-defined lifetime used to compute the derived expiry.
	pub expires_in: Duration,
}

/// Xbox Live user token plus the user hash claim.
#[derive(Clone, Debug)]
pub struct UserToken {
	/// Signed user token.
	pub token: TokenSecret,
	/// `DisplayClaims.xui[0].uhs`.
	pub user_hash: String,
}

/// Output of the derived-credential hop.
#[derive(Clone, Debug)]
pub struct DerivedGrant {
	/// The derived (Spartan) credential.
	pub credential: DerivedCredential,
	/// `XBL3.0 x=<uhs>;<xsts>` authorization value for Xbox Live APIs.
	pub xbl_authorization: TokenSecret,
	/// Expiry the Spartan endpoint reported for the credential, when parseable.
	pub provider_reported_expiry: Option<OffsetDateTime>,
}

/// Contract for the three network hops of the chain plus the profile lookup.
pub trait ExchangeClient
where
	Self: Send + Sync,
{
	/// Redeems an authorization code for an OAuth token pair.
	fn exchange_authorization_code<'a>(&'a self, code: &'a str)
	-> ExchangeFuture<'a, OAuthTokens>;

	/// Redeems a refresh token for a new OAuth token pair.
	fn exchange_refresh_token<'a>(
		&'a self,
		refresh_token: &'a str,
	) -> ExchangeFuture<'a, OAuthTokens>;

	/// Trades an OAuth access token for a user token.
	fn exchange_for_user_token<'a>(
		&'a self,
		access_token: &'a TokenSecret,
	) -> ExchangeFuture<'a, UserToken>;

	/// Trades a user token for the derived credential.
	fn exchange_for_derived_credential<'a>(
		&'a self,
		user_token: &'a UserToken,
	) -> ExchangeFuture<'a, DerivedGrant>;

	/// Fetches the player profile with a freshly minted derived credential.
	fn fetch_profile<'a>(&'a self, grant: &'a DerivedGrant) -> ExchangeFuture<'a, ProfileRecord>;
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn hop_labels_are_stable() {
		assert_eq!(Hop::OAuth.to_string(), "oauth");
		assert_eq!(Hop::UserToken.as_str(), "user_token");
		assert_eq!(Hop::Profile.as_str(), "profile");
	}
}
