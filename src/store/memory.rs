//! Thread-safe in-memory stores; state lives for the lifetime of the process.

// self
use crate::{
	_prelude::*,
	auth::{DerivedCredential, ProfileRecord, RefreshRecord},
	store::{CompareAndSwapOutcome, CredentialStore, ProfileCache, StoreError, StoreFuture},
};

type RecordMap = Arc<RwLock<HashMap<DerivedCredential, RefreshRecord>>>;
type ProfileMap = Arc<Mutex<HashMap<DerivedCredential, ProfileRecord>>>;

/// In-process [`CredentialStore`] guarded by a read-write lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(RecordMap);
impl MemoryStore {
	/// Number of outstanding refresh records.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no refresh records are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	/// Returns `true` when a record is filed under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.0.read().contains_key(key)
	}

	fn put_now(
		map: RecordMap,
		key: DerivedCredential,
		record: RefreshRecord,
	) -> Result<(), StoreError> {
		map.write().insert(key, record);

		Ok(())
	}

	fn get_now(map: RecordMap, key: &DerivedCredential) -> Option<RefreshRecord> {
		map.read().get(key).cloned()
	}

	fn delete_now(map: RecordMap, key: &DerivedCredential) -> Option<RefreshRecord> {
		map.write().remove(key)
	}

	fn rotate_now(
		map: RecordMap,
		previous: &DerivedCredential,
		expected_refresh: &str,
		next: DerivedCredential,
		replacement: RefreshRecord,
	) -> CompareAndSwapOutcome {
		let mut guard = map.write();
		let outcome = match guard.get(previous) {
			Some(existing) if existing.refresh_token.expose() == expected_refresh =>
				CompareAndSwapOutcome::Updated,
			Some(_) => CompareAndSwapOutcome::RefreshMismatch,
			None => CompareAndSwapOutcome::Missing,
		};

		if matches!(outcome, CompareAndSwapOutcome::Updated) {
			guard.remove(previous);
			guard.insert(next, replacement);
		}

		outcome
	}
}
impl CredentialStore for MemoryStore {
	fn put(&self, key: DerivedCredential, record: RefreshRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::put_now(map, key, record) })
	}

	fn get<'a>(&'a self, key: &'a DerivedCredential) -> StoreFuture<'a, Option<RefreshRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, key)) })
	}

	fn delete<'a>(
		&'a self,
		key: &'a DerivedCredential,
	) -> StoreFuture<'a, Option<RefreshRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::delete_now(map, key)) })
	}

	fn rotate<'a>(
		&'a self,
		previous: &'a DerivedCredential,
		expected_refresh: &'a str,
		next: DerivedCredential,
		replacement: RefreshRecord,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(async move {
			Ok(Self::rotate_now(map, previous, expected_refresh, next, replacement))
		})
	}
}

/// In-process [`ProfileCache`]; reads remove the entry under the same lock.
#[derive(Clone, Debug, Default)]
pub struct MemoryProfileCache(ProfileMap);
impl MemoryProfileCache {
	/// Number of profiles waiting to be redeemed.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no profiles are pending.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	/// Returns `true` when a profile is filed under `key`.
	pub fn contains(&self, key: &str) -> bool {
		self.0.lock().contains_key(key)
	}
}
impl ProfileCache for MemoryProfileCache {
	fn put(&self, key: DerivedCredential, profile: ProfileRecord) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			map.lock().insert(key, profile);

			Ok::<_, StoreError>(())
		})
	}

	fn take_once<'a>(
		&'a self,
		key: &'a DerivedCredential,
	) -> StoreFuture<'a, Option<ProfileRecord>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.lock().remove(key)) })
	}
}
