//! Player profile fetched right after a successful delegation chain.

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, TokenSecret},
};

/// Profile handed from the authentication flow to the first request presenting the credential.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
	/// Player display name.
	pub gamertag: String,
	/// Xbox user identifier.
	pub xuid: String,
	/// Derived credential the profile was fetched with.
	pub credential: DerivedCredential,
	/// `XBL3.0 x=<uhs>;<xsts>` authorization value minted alongside the credential.
	pub xbl_authorization: TokenSecret,
}
