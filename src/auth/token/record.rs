//! Refresh records, the dual-clock expiry model, and their builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Lifecycle classification of a derived credential at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// Usable as-is: outside the refresh window and the refresh token is alive.
	Valid,
	/// Inside the refresh window (or past the derived expiry) while the refresh token is alive.
	RefreshablyExpiring,
	/// The refresh token itself is dead; no refresh is possible.
	ProviderExpired,
}

/// Errors produced by [`RefreshRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RefreshRecordBuilderError {
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no derived expiry (absolute or relative) was configured.
	#[error("Derived expiry must be supplied via derived_expiry or expires_in.")]
	MissingExpiry,
}

/// Refresh metadata stored for one outstanding derived credential.
///
/// `provider_expiry` bounds the refresh token and is independent of `derived_expiry`; it is
/// carried forward unchanged across refreshes.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
	/// Refresh token redeemable for a new OAuth pair.
	pub refresh_token: TokenSecret,
	/// Instant the chain that produced this record completed.
	pub issued_at: OffsetDateTime,
	/// Instant after which the derived credential is unusable.
	pub derived_expiry: OffsetDateTime,
	/// Instant after which the refresh token is unusable.
	pub provider_expiry: OffsetDateTime,
}
impl RefreshRecord {
	/// Returns a builder for constructing records.
	pub fn builder() -> RefreshRecordBuilder {
		RefreshRecordBuilder::default()
	}

	/// Classifies the record at `instant`, treating `window` before the derived expiry as
	/// already expiring.
	///
	/// The provider expiry is checked first: a derived credential that still looks valid is
	/// worthless once the refresh token has died.
	pub fn status_at(&self, instant: OffsetDateTime, window: Duration) -> CredentialStatus {
		if instant >= self.provider_expiry {
			return CredentialStatus::ProviderExpired;
		}
		if instant >= self.derived_expiry - window {
			return CredentialStatus::RefreshablyExpiring;
		}

		CredentialStatus::Valid
	}

	/// Time left before the derived credential expires (negative once past).
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		self.derived_expiry - instant
	}
}
impl Debug for RefreshRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshRecord")
			.field("refresh_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("derived_expiry", &self.derived_expiry)
			.field("provider_expiry", &self.provider_expiry)
			.finish()
	}
}

/// Builder for [`RefreshRecord`].
#[derive(Clone, Debug, Default)]
pub struct RefreshRecordBuilder {
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	derived_expiry: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
	provider_expiry: Option<OffsetDateTime>,
}
impl RefreshRecordBuilder {
	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute derived expiry.
	pub fn derived_expiry(mut self, instant: OffsetDateTime) -> Self {
		self.derived_expiry = Some(instant);

		self
	}

	/// Sets the derived expiry relative to the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Sets the provider expiry. Defaults to the derived expiry when omitted.
	pub fn provider_expiry(mut self, instant: OffsetDateTime) -> Self {
		self.provider_expiry = Some(instant);

		self
	}

	/// Consumes the builder and produces a [`RefreshRecord`].
	pub fn build(self) -> Result<RefreshRecord, RefreshRecordBuilderError> {
		let refresh_token =
			self.refresh_token.ok_or(RefreshRecordBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let derived_expiry = match (self.derived_expiry, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(RefreshRecordBuilderError::MissingExpiry),
		};
		let provider_expiry = self.provider_expiry.unwrap_or(derived_expiry);

		Ok(RefreshRecord { refresh_token, issued_at, derived_expiry, provider_expiry })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	const WINDOW: Duration = Duration::minutes(5);

	fn record(derived: Duration, provider: Duration) -> (RefreshRecord, OffsetDateTime) {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let record = RefreshRecord::builder()
			.refresh_token("refresh-1")
			.issued_at(issued)
			.expires_in(derived)
			.provider_expiry(issued + provider)
			.build()
			.expect("Refresh record fixture should build successfully.");

		(record, issued)
	}

	#[test]
	fn status_is_valid_outside_refresh_window() {
		let (record, issued) = record(Duration::hours(1), Duration::hours(24));

		assert_eq!(record.status_at(issued, WINDOW), CredentialStatus::Valid);
		assert_eq!(
			record.status_at(issued + Duration::minutes(55) - Duration::seconds(1), WINDOW),
			CredentialStatus::Valid
		);
	}

	#[test]
	fn refresh_window_is_inclusive_and_covers_past_expiry() {
		let (record, issued) = record(Duration::hours(1), Duration::hours(24));

		assert_eq!(
			record.status_at(issued + Duration::minutes(55), WINDOW),
			CredentialStatus::RefreshablyExpiring
		);
		assert_eq!(
			record.status_at(issued + Duration::hours(2), WINDOW),
			CredentialStatus::RefreshablyExpiring
		);
	}

	#[test]
	fn provider_expiry_wins_over_derived_expiry() {
		let (record, issued) = record(Duration::hours(48), Duration::hours(24));

		assert_eq!(
			record.status_at(issued + Duration::hours(24), WINDOW),
			CredentialStatus::ProviderExpired
		);
		assert_eq!(
			record.status_at(issued + Duration::hours(25), WINDOW),
			CredentialStatus::ProviderExpired
		);
	}

	#[test]
	fn provider_expiry_defaults_to_derived_expiry() {
		let issued = macros::datetime!(2025-11-10 12:00 UTC);
		let record = RefreshRecord::builder()
			.refresh_token("refresh-1")
			.issued_at(issued)
			.expires_in(Duration::hours(1))
			.build()
			.expect("Refresh record fixture should build successfully.");

		assert_eq!(record.provider_expiry, record.derived_expiry);
		assert_eq!(record.remaining_at(issued), Duration::hours(1));
	}

	#[test]
	fn builder_requires_token_and_expiry() {
		let err = RefreshRecord::builder()
			.expires_in(Duration::hours(1))
			.build()
			.expect_err("Builder should reject a missing refresh token.");

		assert_eq!(err, RefreshRecordBuilderError::MissingRefreshToken);

		let err = RefreshRecord::builder()
			.refresh_token("refresh-1")
			.build()
			.expect_err("Builder should reject a missing expiry.");

		assert_eq!(err, RefreshRecordBuilderError::MissingExpiry);
	}

	#[test]
	fn debug_redacts_refresh_token() {
		let (record, _) = record(Duration::hours(1), Duration::hours(24));

		assert!(!format!("{record:?}").contains("refresh-1"));
	}
}
