//! Provider descriptor data structures shared by the exchange client and the broker.

/// Builder API for assembling provider descriptors.
pub mod builder;

pub use builder::*;

// self
use crate::_prelude::*;

/// Endpoint set declared by a provider descriptor, one per hop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// Browser-facing authorize endpoint that issues authorization codes.
	pub authorization: Url,
	/// OAuth token endpoint (authorization code and refresh token grants).
	pub token: Url,
	/// User-token endpoint (`user/authenticate`).
	pub user_authenticate: Url,
	/// XSTS authorization endpoint.
	pub xsts_authorize: Url,
	/// Endpoint that mints the derived (Spartan) credential.
	pub spartan_token: Url,
	/// Profile endpoint queried with the derived credential.
	pub profile: Url,
}

/// Immutable provider descriptor consumed by the exchange client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// OAuth scopes requested on the authorize redirect and the token grants.
	pub scopes: Vec<String>,
	/// Relying party named in the user-token request.
	pub user_relying_party: String,
	/// Relying party named in the XSTS request.
	pub xsts_relying_party: String,
	/// Sandbox the XSTS token is issued for.
	pub sandbox_id: String,
	/// Value of the `x-xbl-contract-version` header on Xbox Live hops.
	pub contract_version: String,
	/// Audience requested from the Spartan token endpoint.
	pub spartan_audience: String,
	/// Minimum Spartan token version requested.
	pub spartan_min_version: String,
}
impl ProviderDescriptor {
	/// Creates a new builder seeded with the production Xbox Live values.
	pub fn builder() -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::default()
	}

	/// Production Xbox Live / Halo Waypoint descriptor.
	pub fn xbox_live() -> Result<Self, ProviderDescriptorError> {
		Self::builder().build()
	}

	/// Scopes joined with spaces, as sent on the wire.
	pub fn scope_string(&self) -> String {
		self.scopes.join(" ")
	}
}
