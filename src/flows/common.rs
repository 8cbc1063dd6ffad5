//! The delegation chain shared by login and refresh, plus the per-credential singleflight guards.

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, ProfileRecord, RefreshRecord, TokenSecret},
	error::{ConfigError, ExchangeError, ProviderError},
	exchange::Hop,
	flows::{Broker, SignOutReason},
	store::StoreError,
};

/// Grant that starts the chain.
#[derive(Clone, Copy, Debug)]
pub(crate) enum ChainGrant<'a> {
	AuthorizationCode(&'a str),
	RefreshToken(&'a TokenSecret),
}

/// Everything a successful chain produced; nothing is written until the caller decides to.
#[derive(Debug)]
pub(crate) struct IssuedCredential {
	pub(crate) credential: DerivedCredential,
	pub(crate) record: RefreshRecord,
	pub(crate) profile: ProfileRecord,
}

/// Outcome published by the caller that resolved an expiring credential, so callers queued on
/// the same guard observe it instead of re-running the chain.
#[derive(Clone, Debug)]
pub(crate) enum Resolution {
	Refreshed(DerivedCredential),
	SignedOut(SignOutReason),
}

pub(crate) type FlowGuard = Arc<AsyncMutex<Option<Resolution>>>;

/// Runs every hop in order and assembles the new refresh record.
///
/// `carried_provider_expiry` is `Some` on refresh; a fresh login derives it from the configured
/// provider lifetime or, failing that, from the derived expiry.
pub(crate) async fn run_chain(
	broker: &Broker,
	grant: ChainGrant<'_>,
	now: OffsetDateTime,
	carried_provider_expiry: Option<OffsetDateTime>,
) -> Result<IssuedCredential> {
	let exchange = broker.exchange.as_ref();
	let (tokens, previous_refresh) = match grant {
		ChainGrant::AuthorizationCode(code) =>
			(exchange.exchange_authorization_code(code).await?, None),
		ChainGrant::RefreshToken(refresh) =>
			(exchange.exchange_refresh_token(refresh.expose()).await?, Some(refresh)),
	};
	let refresh_token = tokens.refresh_token.or_else(|| previous_refresh.cloned()).ok_or_else(
		|| ExchangeError::new(Hop::OAuth, ProviderError::MissingClaim { claim: "refresh_token" }),
	)?;

	flow_event!(debug, hop = %Hop::OAuth, "oauth tokens issued");

	let user_token = exchange.exchange_for_user_token(&tokens.access_token).await?;

	flow_event!(debug, hop = %Hop::UserToken, "user token issued");

	let grant = exchange.exchange_for_derived_credential(&user_token).await?;

	flow_event!(debug, hop = %Hop::Spartan, "derived credential issued");

	let profile = exchange.fetch_profile(&grant).await?;
	let derived_expiry = now.checked_add(tokens.expires_in).ok_or_else(|| {
		ExchangeError::new(Hop::OAuth, ProviderError::ExpiresInOutOfRange)
	})?;
	// The Spartan endpoint may report an earlier expiry than the OAuth lifetime implies; a
	// reported instant that is not in the future is clock skew and ignored.
	let derived_expiry = match grant.provider_reported_expiry {
		Some(reported) if reported > now => derived_expiry.min(reported),
		_ => derived_expiry,
	};
	let provider_expiry = carried_provider_expiry
		.or_else(|| broker.provider_lifetime.map(|lifetime| now.saturating_add(lifetime)))
		.unwrap_or(derived_expiry);
	let record = RefreshRecord::builder()
		.refresh_token(refresh_token.expose())
		.issued_at(now)
		.derived_expiry(derived_expiry)
		.provider_expiry(provider_expiry)
		.build()
		.map_err(ConfigError::from)?;

	Ok(IssuedCredential { credential: grant.credential, record, profile })
}

/// Deletes a record written earlier in a flow whose follow-up write failed.
///
/// Returns the error to surface: `cause` alone, or `cause` combined with the rollback failure
/// when the record could not be removed.
pub(crate) async fn roll_back_record(
	broker: &Broker,
	credential: &DerivedCredential,
	cause: StoreError,
) -> Error {
	match broker.credentials.delete(credential).await {
		Ok(_) => cause.into(),
		Err(rollback) => {
			flow_event!(warn, error = %rollback, "refresh record rollback failed");

			StoreError::Backend {
				message: format!("{cause} Rolling back the refresh record also failed: {rollback}"),
			}
			.into()
		},
	}
}

/// Handle on a credential's singleflight guard.
///
/// Dropping the lease prunes the map entry once no other caller holds or waits on the guard, so
/// a published resolution never outlives the callers it was published for. This also runs when
/// the owning future is cancelled.
pub(crate) struct FlowGuardLease<'a> {
	broker: &'a Broker,
	key: DerivedCredential,
	guard: FlowGuard,
}
impl<'a> FlowGuardLease<'a> {
	/// Returns (and creates on demand) the guard for `key`.
	pub(crate) fn acquire(broker: &'a Broker, key: &DerivedCredential) -> Self {
		let guard = broker
			.flow_guards
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(AsyncMutex::new(None)))
			.clone();

		Self { broker, key: key.clone(), guard }
	}

	pub(crate) fn guard(&self) -> &FlowGuard {
		&self.guard
	}
}
impl Drop for FlowGuardLease<'_> {
	fn drop(&mut self) {
		let mut guards = self.broker.flow_guards.lock();
		let idle = match guards.get(&self.key) {
			Some(current) =>
				Arc::ptr_eq(current, &self.guard) && Arc::strong_count(&self.guard) == 2,
			None => false,
		};

		if idle {
			guards.remove(&self.key);
		}
	}
}
