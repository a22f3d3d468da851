//! File-backed [`CredentialStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Credential, Secret},
	config::{DEFAULT_STORAGE_KEY, SessionConfig},
	store::{CredentialStore, LoadFuture, StoreError, StoreFuture},
};

type Entries = BTreeMap<String, String>;

/// Persists the token as one entry of a JSON object, rewriting the file atomically.
///
/// Entries under other keys are preserved, so several deployments can share one file.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	key: String,
	write_lock: Arc<Mutex<()>>,
}
impl FileStore {
	/// Opens a store at `path` using the default storage key, creating parent directories.
	///
	/// The file itself is only created on the first save.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		Ok(Self { path, key: DEFAULT_STORAGE_KEY.into(), write_lock: Default::default() })
	}

	/// Opens a store at `path` keyed by [`SessionConfig::storage_key`].
	pub fn for_session(path: impl Into<PathBuf>, config: &SessionConfig) -> Result<Self, StoreError> {
		Ok(Self::open(path)?.with_key(config.storage_key.clone()))
	}

	/// Overrides the storage key.
	pub fn with_key(mut self, key: impl Into<String>) -> Self {
		self.key = key.into();

		self
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_entries(path: &Path) -> Result<Entries, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
			Err(e) => {
				return Err(StoreError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				});
			},
		};

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Entries::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store contents: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}

	/// Reads the current entries, discarding a corrupted file so a write can replace it.
	fn entries_for_write(&self) -> Result<Entries, StoreError> {
		match Self::read_entries(&self.path) {
			Ok(entries) => Ok(entries),
			Err(StoreError::Serialization { message }) => {
				tracing::warn!(path = %self.path.display(), %message, "Replacing corrupted credential file.");

				Ok(Entries::new())
			},
			Err(e) => Err(e),
		}
	}
}
impl CredentialStore for FileStore {
	fn save<'a>(&'a self, credential: &'a Credential) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();
			let mut entries = self.entries_for_write()?;

			entries.insert(self.key.clone(), credential.token.expose().to_owned());

			self.persist(&entries)
		})
	}

	fn load(&self) -> LoadFuture<'_> {
		Box::pin(async move {
			match Self::read_entries(&self.path) {
				Ok(mut entries) =>
					entries.remove(&self.key).filter(|token| !token.trim().is_empty()).map(Secret::new),
				Err(e) => {
					tracing::warn!(
						path = %self.path.display(),
						error = %e,
						"Credential file is unreadable; treating it as empty."
					);

					None
				},
			}
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let _guard = self.write_lock.lock();
			let mut entries = self.entries_for_write()?;

			if entries.remove(&self.key).is_none() && !self.path.exists() {
				return Ok(());
			}

			self.persist(&entries)
		})
	}
}
