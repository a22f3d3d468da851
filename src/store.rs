//! Persistence contract and built-in stores for the session's bearer token.
//!
//! A store holds exactly one token string under a fixed storage key. It is read once on
//! process start ([`crate::session::SessionManager::restore`]) and written only on a
//! successful renewal or an explicit logout.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{Credential, Secret},
};

/// Boxed future returned by fallible store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;
/// Boxed future returned by [`CredentialStore::load`], which cannot fail.
pub type LoadFuture<'a> = Pin<Box<dyn Future<Output = Option<Secret>> + 'a + Send>>;

/// Storage backend contract implemented by credential stores.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Persists the credential's token, overwriting any prior value.
	fn save<'a>(&'a self, credential: &'a Credential) -> StoreFuture<'a, ()>;

	/// Returns the previously saved token, if any.
	///
	/// Missing or corrupted storage is reported as `None`, never as an error.
	fn load(&self) -> LoadFuture<'_>;

	/// Removes the persisted token. Clearing an empty store succeeds.
	fn clear(&self) -> StoreFuture<'_, ()>;
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
