//! Storage contracts and built-in store implementations for session credentials.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{CredentialKey, Credentials, TokenSecret},
};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Key/value persistence capability for session credentials.
///
/// The client never assumes a particular backend (cookie jar, keychain, file, memory); it only
/// reads, writes, and removes individual [`CredentialKey`] slots.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the secret stored under `key`, if present.
	fn get(&self, key: CredentialKey) -> StoreFuture<'_, Option<TokenSecret>>;

	/// Persists or replaces the secret stored under `key`.
	fn set(&self, key: CredentialKey, value: TokenSecret) -> StoreFuture<'_, ()>;

	/// Removes the secret stored under `key`; missing keys are not an error.
	fn remove(&self, key: CredentialKey) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`CredentialStore`] implementations.
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

/// Loads the full credential pair; returns `None` unless both halves are present.
pub async fn load_credentials(
	store: &(impl ?Sized + CredentialStore),
) -> Result<Option<Credentials>, StoreError> {
	let access = store.get(CredentialKey::AccessToken).await?;
	let refresh = store.get(CredentialKey::RefreshToken).await?;

	Ok(access.zip(refresh).map(|(access_token, refresh_token)| Credentials {
		access_token,
		refresh_token,
	}))
}

/// Replaces both halves of the stored credential pair.
pub async fn save_credentials(
	store: &(impl ?Sized + CredentialStore),
	credentials: &Credentials,
) -> Result<(), StoreError> {
	store.set(CredentialKey::AccessToken, credentials.access_token.clone()).await?;
	store.set(CredentialKey::RefreshToken, credentials.refresh_token.clone()).await
}

/// Removes both halves of the stored credential pair.
pub async fn clear_credentials(store: &(impl ?Sized + CredentialStore)) -> Result<(), StoreError> {
	store.remove(CredentialKey::AccessToken).await?;
	store.remove(CredentialKey::RefreshToken).await
}
