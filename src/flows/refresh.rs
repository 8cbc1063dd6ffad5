//! Lifecycle checks for presented derived credentials, with singleflight guards and CAS rotation.
//!
//! [`Broker::check_credential`] is evaluated on every request that presents a derived
//! credential. Each check acquires the per-credential guard, classifies the stored record
//! (provider expiry first, then the refresh window), and either passes the credential through,
//! runs the refresh chain, or signs the session out. The caller that resolves an expiring
//! credential publishes its outcome in the guard; callers queued behind it receive the same
//! outcome without contacting the provider again.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::{CredentialStatus, DerivedCredential, ProfileRecord, RefreshRecord},
	exchange::Hop,
	flows::{
		Broker,
		common::{self, ChainGrant, FlowGuard, FlowGuardLease, IssuedCredential, Resolution},
	},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::CompareAndSwapOutcome,
};

/// Why a lifecycle check ended the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignOutReason {
	/// No refresh record exists for the presented credential.
	NotFound,
	/// The provider expiry has passed; the refresh token is dead.
	ProviderExpired,
	/// A hop of the refresh chain failed and the stale record was torn down.
	RefreshFailed {
		/// Hop that failed, when the failure came from the exchange client.
		hop: Option<Hop>,
	},
	/// The record was replaced by a concurrent writer while the refresh chain ran.
	Superseded,
}

/// Outcome of a lifecycle check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialCheck {
	/// The presented credential is usable as-is.
	Valid(DerivedCredential),
	/// The presented credential was replaced; callers must switch to the new one.
	Refreshed(DerivedCredential),
	/// Terminal: the caller must re-authenticate from an authorization code.
	SignedOut(SignOutReason),
}
impl CredentialCheck {
	/// Credential the caller should use from now on; `None` signals sign-out.
	pub fn credential(&self) -> Option<&DerivedCredential> {
		match self {
			Self::Valid(credential) | Self::Refreshed(credential) => Some(credential),
			Self::SignedOut(_) => None,
		}
	}

	/// Returns `true` when the session ended.
	pub fn is_signed_out(&self) -> bool {
		matches!(self, Self::SignedOut(_))
	}

	/// Converts the check into the broker's error taxonomy.
	///
	/// A dead refresh token maps to [`Error::ExpiredRefresh`]; every other sign-out leaves no
	/// record behind and maps to [`Error::NotFound`].
	pub fn into_result(self) -> Result<DerivedCredential> {
		match self {
			Self::Valid(credential) | Self::Refreshed(credential) => Ok(credential),
			Self::SignedOut(SignOutReason::ProviderExpired) => Err(Error::ExpiredRefresh),
			Self::SignedOut(_) => Err(Error::NotFound),
		}
	}

	fn from_resolution(resolution: Resolution) -> Self {
		match resolution {
			Resolution::Refreshed(credential) => Self::Refreshed(credential),
			Resolution::SignedOut(reason) => Self::SignedOut(reason),
		}
	}
}

impl Broker {
	/// Returns the shared counters for lifecycle checks.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.refresh_metrics.clone()
	}

	/// Checks a presented credential at the current time.
	pub async fn check_credential(&self, credential: &DerivedCredential) -> Result<CredentialCheck> {
		self.check_credential_at(credential, OffsetDateTime::now_utc()).await
	}

	/// Checks a presented credential at `now`, refreshing or signing out as required.
	///
	/// Chain failures during a refresh are not returned as errors: they tear down the stale
	/// record and yield [`SignOutReason::RefreshFailed`]. Errors are reserved for storage
	/// failures.
	pub async fn check_credential_at(
		&self,
		credential: &DerivedCredential,
		now: OffsetDateTime,
	) -> Result<CredentialCheck> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "check_credential");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.refresh_metrics.record_attempt();

		let result = span
			.instrument(async move {
				let lease = FlowGuardLease::acquire(self, credential);

				self.check_guarded(credential, lease.guard(), now).await
			})
			.await;

		match &result {
			Ok(CredentialCheck::SignedOut(_reason)) => {
				flow_event!(info, reason = ?_reason, "session signed out");

				self.refresh_metrics.record_sign_out();
				obs::record_flow_outcome(KIND, FlowOutcome::SignedOut);
			},
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(_) => obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	/// Removes and returns the profile fetched for `credential`; later calls yield `None`.
	pub async fn take_profile(&self, credential: &DerivedCredential) -> Result<Option<ProfileRecord>> {
		Ok(self.profiles.take_once(credential).await?)
	}

	/// Ends the session for `credential`, removing its refresh record and pending profile.
	///
	/// When a concurrent check already refreshed `credential`, its successor is signed out too.
	/// Returns `true` when a refresh record was removed.
	pub async fn sign_out(&self, credential: &DerivedCredential) -> Result<bool> {
		let span = FlowSpan::new(FlowKind::Refresh, "sign_out");

		span.instrument(async move {
			let lease = FlowGuardLease::acquire(self, credential);
			let mut resolution = lease.guard().lock().await;
			let mut removed = self.discard(credential).await?;

			if let Some(Resolution::Refreshed(next)) = resolution.as_ref() {
				removed |= self.discard(next).await?;
			}

			*resolution = Some(Resolution::SignedOut(SignOutReason::NotFound));

			flow_event!(info, removed, "session signed out on request");

			Ok::<_, Error>(removed)
		})
		.await
	}

	async fn check_guarded(
		&self,
		credential: &DerivedCredential,
		guard: &FlowGuard,
		now: OffsetDateTime,
	) -> Result<CredentialCheck> {
		let mut resolution = guard.lock().await;

		if let Some(published) = resolution.clone() {
			flow_event!(debug, "joining a resolution published by a concurrent check");

			// The successor may have been signed out since it was published.
			let published = match published {
				Resolution::Refreshed(next) if self.credentials.get(&next).await?.is_none() =>
					Resolution::SignedOut(SignOutReason::NotFound),
				other => other,
			};

			self.refresh_metrics.record_reuse();
			*resolution = Some(published.clone());

			return Ok(CredentialCheck::from_resolution(published));
		}

		let Some(record) = self.credentials.get(credential).await? else {
			return Ok(CredentialCheck::SignedOut(SignOutReason::NotFound));
		};
		let outcome = match record.status_at(now, self.refresh_window) {
			CredentialStatus::Valid => {
				self.refresh_metrics.record_reuse();

				return Ok(CredentialCheck::Valid(credential.clone()));
			},
			CredentialStatus::ProviderExpired => {
				flow_event!(debug, "provider expiry passed");

				self.discard(credential).await?;

				Resolution::SignedOut(SignOutReason::ProviderExpired)
			},
			CredentialStatus::RefreshablyExpiring => self.refresh(credential, &record, now).await?,
		};

		*resolution = Some(outcome.clone());

		Ok(CredentialCheck::from_resolution(outcome))
	}

	async fn refresh(
		&self,
		credential: &DerivedCredential,
		record: &RefreshRecord,
		now: OffsetDateTime,
	) -> Result<Resolution> {
		flow_event!(
			debug,
			remaining_secs = record.remaining_at(now).whole_seconds(),
			"credential inside the refresh window"
		);

		let issued = match common::run_chain(
			self,
			ChainGrant::RefreshToken(&record.refresh_token),
			now,
			Some(record.provider_expiry),
		)
		.await
		{
			Ok(issued) => issued,
			Err(err) => {
				flow_event!(warn, error = %err, "refresh chain failed");

				self.refresh_metrics.record_failure();
				self.discard(credential).await?;

				return Ok(Resolution::SignedOut(SignOutReason::RefreshFailed { hop: err.hop() }));
			},
		};
		let IssuedCredential { credential: next, record: replacement, profile } = issued;
		let outcome = self
			.credentials
			.rotate(credential, record.refresh_token.expose(), next.clone(), replacement)
			.await?;

		match outcome {
			CompareAndSwapOutcome::Updated => {
				if let Err(err) = self.profiles.put(next.clone(), profile).await {
					return Err(common::roll_back_record(self, &next, err).await);
				}

				self.refresh_metrics.record_refresh();

				Ok(Resolution::Refreshed(next))
			},
			CompareAndSwapOutcome::Missing => Ok(Resolution::SignedOut(SignOutReason::NotFound)),
			CompareAndSwapOutcome::RefreshMismatch =>
				Ok(Resolution::SignedOut(SignOutReason::Superseded)),
		}
	}

	/// Deletes the record and any pending profile for `credential`.
	async fn discard(&self, credential: &DerivedCredential) -> Result<bool> {
		let removed = self.credentials.delete(credential).await?.is_some();

		self.profiles.take_once(credential).await?;

		Ok(removed)
	}
}
