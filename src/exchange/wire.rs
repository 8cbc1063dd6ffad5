//! Request and response bodies for the Xbox Live and Halo Waypoint hops.

// self
use crate::_prelude::*;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserTokenRequest<'a> {
	pub properties: UserTokenProperties<'a>,
	pub relying_party: &'a str,
	pub token_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct UserTokenProperties<'a> {
	pub auth_method: &'a str,
	pub site_name: &'a str,
	pub rps_ticket: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct XstsRequest<'a> {
	pub properties: XstsProperties<'a>,
	pub relying_party: &'a str,
	pub token_type: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct XstsProperties<'a> {
	pub sandbox_id: &'a str,
	pub user_tokens: [&'a str; 1],
}

/// Shared response shape of the user-token and XSTS endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct XboxTokenResponse {
	pub token: String,
	#[serde(default)]
	pub display_claims: DisplayClaims,
}
impl XboxTokenResponse {
	pub(crate) fn user_hash(&self) -> Option<&str> {
		self.display_claims
			.xui
			.iter()
			.find_map(|claim| claim.uhs.as_deref())
			.filter(|uhs| !uhs.is_empty())
	}
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DisplayClaims {
	#[serde(default)]
	pub xui: Vec<UserClaim>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserClaim {
	#[serde(default)]
	pub uhs: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpartanTokenRequest<'a> {
	pub audience: &'a str,
	pub min_version: &'a str,
	pub proof: [SpartanProof<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpartanProof<'a> {
	pub token: &'a str,
	pub token_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SpartanTokenResponse {
	pub spartan_token: String,
	#[serde(default)]
	pub expires_utc: Option<SpartanExpiry>,
}
impl SpartanTokenResponse {
	/// Parses the reported expiry; unparseable values are treated as absent.
	pub(crate) fn expires_at(&self) -> Option<OffsetDateTime> {
		let raw = self.expires_utc.as_ref()?.iso8601_date.as_str();

		OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).ok()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpartanExpiry {
	#[serde(rename = "ISO8601Date")]
	pub iso8601_date: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileResponse {
	pub xuid: String,
	pub gamertag: String,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn user_token_request_uses_pascal_case() {
		let body = UserTokenRequest {
			properties: UserTokenProperties {
				auth_method: "RPS",
				site_name: "user.auth.xboxlive.com",
				rps_ticket: "d=access".into(),
			},
			relying_party: "http://auth.xboxlive.com",
			token_type: "JWT",
		};
		let value = serde_json::to_value(&body).expect("Request body should serialize.");

		assert_eq!(value["Properties"]["RpsTicket"], "d=access");
		assert_eq!(value["Properties"]["AuthMethod"], "RPS");
		assert_eq!(value["RelyingParty"], "http://auth.xboxlive.com");
		assert_eq!(value["TokenType"], "JWT");
	}

	#[test]
	fn token_response_exposes_first_user_hash() {
		let response: XboxTokenResponse = serde_json::from_str(
			r#"{"Token":"user-token","DisplayClaims":{"xui":[{"uhs":"hash-1"}]},"IssueInstant":"x"}"#,
		)
		.expect("Token response should deserialize.");

		assert_eq!(response.token, "user-token");
		assert_eq!(response.user_hash(), Some("hash-1"));

		let response: XboxTokenResponse = serde_json::from_str(r#"{"Token":"user-token"}"#)
			.expect("Token response without claims should deserialize.");

		assert_eq!(response.user_hash(), None);
	}

	#[test]
	fn spartan_response_parses_expiry() {
		let response: SpartanTokenResponse = serde_json::from_str(
			r#"{"SpartanToken":"D1","ExpiresUtc":{"ISO8601Date":"2025-11-10T13:00:00Z"}}"#,
		)
		.expect("Spartan response should deserialize.");

		assert_eq!(response.spartan_token, "D1");
		assert_eq!(
			response.expires_at().map(OffsetDateTime::unix_timestamp),
			Some(time::macros::datetime!(2025-11-10 13:00 UTC).unix_timestamp())
		);
	}

	#[test]
	fn spartan_request_carries_xsts_proof() {
		let body = SpartanTokenRequest {
			audience: "urn:343:s3:services",
			min_version: "4",
			proof: [SpartanProof { token: "xsts", token_type: "Xbox_XSTSv3" }],
		};
		let value = serde_json::to_value(&body).expect("Request body should serialize.");

		assert_eq!(value["Proof"][0]["TokenType"], "Xbox_XSTSv3");
		assert_eq!(value["MinVersion"], "4");
	}
}
