//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, TokenSecret},
	store::{CredentialStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<CredentialKey, TokenSecret>>>;

/// Thread-safe storage backend that keeps credentials in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of populated slots.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no credentials are stored.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn set_now(map: StoreMap, key: CredentialKey, value: TokenSecret) -> Result<(), StoreError> {
		map.write().insert(key, value);

		Ok(())
	}

	fn remove_now(map: StoreMap, key: CredentialKey) -> Result<(), StoreError> {
		map.write().remove(&key);

		Ok(())
	}
}
impl CredentialStore for MemoryStore {
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(&key).cloned()) })
	}

	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::set_now(map, key, value) })
	}

	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::remove_now(map, key) })
	}
}
