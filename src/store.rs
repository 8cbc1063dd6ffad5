//! Storage contracts and built-in in-memory implementations for refresh records and pending
//! profiles.
//!
//! Both contracts return boxed futures so a networked key-value store can stand in for the
//! in-process maps without touching the lifecycle state machine.

pub mod memory;

pub use memory::{MemoryProfileCache, MemoryStore};

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, ProfileRecord, RefreshRecord},
};

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Keyed map from derived credential to refresh metadata.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists or replaces the record filed under `key` (last write wins).
	fn put(&self, key: DerivedCredential, record: RefreshRecord) -> StoreFuture<'_, ()>;

	/// Fetches the record filed under `key`, if present.
	fn get<'a>(&'a self, key: &'a DerivedCredential) -> StoreFuture<'a, Option<RefreshRecord>>;

	/// Removes the record filed under `key`, returning it when it existed.
	fn delete<'a>(&'a self, key: &'a DerivedCredential)
	-> StoreFuture<'a, Option<RefreshRecord>>;

	/// Atomically moves a record from `previous` to `next` if the record under `previous` still
	/// carries `expected_refresh`.
	fn rotate<'a>(
		&'a self,
		previous: &'a DerivedCredential,
		expected_refresh: &'a str,
		next: DerivedCredential,
		replacement: RefreshRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;
}

/// Keyed map from derived credential to a profile that may be read exactly once.
pub trait ProfileCache
where
	Self: Send + Sync,
{
	/// Files `profile` under `key`, replacing any pending profile.
	fn put(&self, key: DerivedCredential, profile: ProfileRecord) -> StoreFuture<'_, ()>;

	/// Removes and returns the profile filed under `key`; a second call yields `None`.
	fn take_once<'a>(
		&'a self,
		key: &'a DerivedCredential,
	) -> StoreFuture<'a, Option<ProfileRecord>>;
}

/// Result of a refresh-record rotation attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The refresh token matched; the old key was removed and the new key inserted.
	Updated,
	/// A record exists under the old key but carries a different refresh token.
	RefreshMismatch,
	/// No record exists under the old key.
	Missing,
}

/// Error type produced by store implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
