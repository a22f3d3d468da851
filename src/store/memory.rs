//! Thread-safe in-memory [`CredentialStore`] implementation for embedding and tests.

// self
use crate::{
	_prelude::*,
	auth::{Credential, Secret},
	store::{CredentialStore, LoadFuture, StoreFuture},
};

type Slot = Arc<RwLock<Option<Secret>>>;

/// Storage backend that keeps the token in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store that already holds `token`, as if persisted by an earlier run.
	pub fn with_token(token: impl Into<Secret>) -> Self {
		Self(Arc::new(RwLock::new(Some(token.into()))))
	}

	/// Returns the held token without going through the async contract.
	pub fn snapshot(&self) -> Option<Secret> {
		self.0.read().clone()
	}
}
impl CredentialStore for MemoryStore {
	fn save<'a>(&'a self, credential: &'a Credential) -> StoreFuture<'a, ()> {
		let slot = self.0.clone();
		let token = credential.token.clone();

		Box::pin(async move {
			*slot.write() = Some(token);

			Ok(())
		})
	}

	fn load(&self) -> LoadFuture<'_> {
		let slot = self.0.clone();

		Box::pin(async move { slot.read().clone() })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}
}
