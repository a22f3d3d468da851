//! Session manager owning the bearer credential's lifecycle.
//!
//! The manager caches one [`Credential`] per instance, restores it from a [`CredentialStore`] on
//! start, renews it through the identity endpoint when it goes stale, and clears it on logout.
//!
//! # Single-flight renewal
//!
//! A renewal is a shared future parked in the session while the state is
//! [`SessionState::Authenticating`]. The first caller that finds the session stale launches it;
//! every later caller clones and awaits the same future, so at most one login exchange is in
//! flight per manager. The future settles the session state itself, which means dropping any
//! one caller (including the one that launched it) does not abandon the exchange: whoever awaits
//! next drives it to completion and every waiter observes the same outcome.
//!
//! A failed renewal is not retried in the background; the next caller that needs a credential
//! starts a fresh exchange.

mod login;
mod metrics;

pub use self::metrics::RenewalMetrics;

// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestTransport;
use crate::{
	_prelude::*,
	auth::{Credential, JwtExpiryInspector, TokenInspector},
	config::SessionConfig,
	error::AuthenticationFailure,
	http::HttpTransport,
	obs::{self, FlowKind, FlowSpan},
	store::CredentialStore,
};

type Flight = Shared<BoxFuture<'static, Result<Credential, AuthenticationFailure>>>;

#[cfg(feature = "reqwest")]
/// Session manager specialized for the crate's default reqwest transport.
pub type ReqwestSessionManager = SessionManager<ReqwestTransport>;

/// Observable state of a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
	/// No attempt has been made to establish a credential.
	Uninitialized,
	/// A login exchange is in flight.
	Authenticating,
	/// A credential is cached and assumed valid until it expires or is rejected.
	Authenticated(Credential),
	/// The last exchange could not produce a usable credential.
	Failed(AuthenticationFailure),
}
impl SessionState {
	/// Returns the cached credential, if any.
	pub fn credential(&self) -> Option<&Credential> {
		match self {
			Self::Authenticated(credential) => Some(credential),
			_ => None,
		}
	}

	/// Returns `true` in the [`SessionState::Authenticated`] state.
	pub fn is_authenticated(&self) -> bool {
		matches!(self, Self::Authenticated(_))
	}
}

struct SessionInner {
	state: SessionState,
	/// Bumped whenever a renewal or an adoption settles the state.
	generation: u64,
	inflight: Option<Flight>,
}
impl SessionInner {
	fn settle(&mut self, state: SessionState) {
		self.state = state;
		self.generation = self.generation.wrapping_add(1);
	}

	fn settled_since(&self, observed: u64) -> Option<Result<Credential, AuthenticationFailure>> {
		if self.generation == observed {
			return None;
		}

		match &self.state {
			SessionState::Authenticated(credential) => Some(Ok(credential.clone())),
			SessionState::Failed(failure) => Some(Err(failure.clone())),
			SessionState::Uninitialized | SessionState::Authenticating => None,
		}
	}
}

enum Restored {
	Adopted(Credential),
	Stale { observed: u64 },
}

/// Owns the current credential and drives its renewal.
///
/// Construct one instance per logical session and share it (typically as
/// `Arc<SessionManager<_>>`) with every [`crate::gateway::Gateway`] that needs it.
pub struct SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Counters describing renewal activity.
	pub metrics: Arc<RenewalMetrics>,
	config: Arc<SessionConfig>,
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	inspector: Arc<dyn TokenInspector>,
	inner: Arc<Mutex<SessionInner>>,
	lifecycle: AsyncMutex<()>,
}
impl<T> SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a manager that reuses the caller-provided transport.
	///
	/// The default [`JwtExpiryInspector`] honours [`SessionConfig::expiry_leeway`].
	pub fn with_transport(
		config: SessionConfig,
		store: Arc<dyn CredentialStore>,
		transport: impl Into<Arc<T>>,
	) -> Self {
		let inspector = Arc::new(JwtExpiryInspector::with_leeway(config.expiry_leeway));

		Self {
			metrics: Default::default(),
			config: Arc::new(config),
			transport: transport.into(),
			store,
			inspector,
			inner: Arc::new(Mutex::new(SessionInner {
				state: SessionState::Uninitialized,
				generation: 0,
				inflight: None,
			})),
			lifecycle: AsyncMutex::new(()),
		}
	}

	/// Replaces the token inspector.
	pub fn with_inspector(mut self, inspector: Arc<dyn TokenInspector>) -> Self {
		self.inspector = inspector;

		self
	}

	/// Configuration this session was built from.
	pub fn config(&self) -> &SessionConfig {
		&self.config
	}

	/// Transport shared with gateways built on this session.
	pub fn transport(&self) -> &Arc<T> {
		&self.transport
	}

	/// Snapshot of the current state.
	pub fn state(&self) -> SessionState {
		self.inner.lock().state.clone()
	}

	/// Returns a credential that is usable right now, renewing it first if necessary.
	///
	/// A cached credential accepted by the inspector is returned without suspending. Otherwise
	/// the caller starts, or joins, the single in-flight renewal.
	pub async fn get_valid_credential(&self) -> Result<Credential> {
		let observed = {
			let inner = self.inner.lock();

			match &inner.state {
				SessionState::Authenticated(credential)
					if self.inspector.is_usable(credential.token.expose(), OffsetDateTime::now_utc()) =>
					return Ok(credential.clone()),
				_ => inner.generation,
			}
		};

		self.renew_since(observed).await
	}

	/// Performs a login exchange, or joins the one already in flight.
	pub async fn renew(&self) -> Result<Credential> {
		let observed = self.inner.lock().generation;

		self.renew_since(observed).await
	}

	/// Renews after the upstream refused `rejected`.
	///
	/// When `rejected` has already been replaced by a newer credential, that credential is
	/// returned without another exchange.
	pub async fn renew_rejected(&self, rejected: &Credential) -> Result<Credential> {
		let observed = {
			let inner = self.inner.lock();

			match &inner.state {
				SessionState::Authenticated(current) if current.token != rejected.token => {
					self.metrics.record_joined();

					return Ok(current.clone());
				},
				_ => inner.generation,
			}
		};

		self.renew_since(observed).await
	}

	/// Adopts the persisted token when it is still usable, otherwise clears it and renews.
	///
	/// Call once on process start.
	pub async fn restore(&self) -> Result<Credential> {
		obs::observe(FlowKind::Restore, "restore", async move {
			match self.adopt_persisted().await {
				Restored::Adopted(credential) => Ok(credential),
				Restored::Stale { observed } => self.renew_since(observed).await,
			}
		})
		.await
	}

	/// Drops the cached credential and clears the store.
	///
	/// A renewal that is still in flight is awaited first so its result cannot outlive the
	/// logout. Does not renew; the next [`SessionManager::get_valid_credential`] call will.
	pub async fn logout(&self) -> Result<()> {
		obs::observe(FlowKind::Logout, "logout", async move {
			let _lifecycle = self.lifecycle.lock().await;

			loop {
				let flight = {
					let mut inner = self.inner.lock();

					match inner.inflight.clone() {
						Some(flight) => flight,
						None => {
							inner.state = SessionState::Uninitialized;

							break;
						},
					}
				};

				if let Err(e) = flight.await {
					tracing::debug!(reason = %e.reason, "Renewal pending at logout failed.");
				}
			}

			self.store.clear().await.map_err(Error::from)
		})
		.await
	}

	async fn adopt_persisted(&self) -> Restored {
		let _lifecycle = self.lifecycle.lock().await;
		let observed = self.inner.lock().generation;
		let Some(token) = self.store.load().await else {
			return Restored::Stale { observed };
		};

		if self.inspector.is_usable(token.expose(), OffsetDateTime::now_utc()) {
			let credential = Credential::inspect(token, self.inspector.as_ref());

			{
				let mut inner = self.inner.lock();

				// A renewal that started or settled during the load takes precedence.
				if inner.inflight.is_some() || inner.generation != observed {
					return Restored::Stale { observed };
				}

				inner.settle(SessionState::Authenticated(credential.clone()));
			}

			tracing::info!(
				expires_at = ?credential.expires_at,
				"Adopted persisted credential without a login exchange."
			);

			return Restored::Adopted(credential);
		}

		tracing::debug!("Persisted credential is stale or undecodable; clearing it.");

		if let Err(e) = self.store.clear().await {
			tracing::warn!(error = %e, "Failed to clear the stale persisted credential.");
		}

		Restored::Stale { observed }
	}

	async fn renew_since(&self, observed: u64) -> Result<Credential> {
		obs::observe(FlowKind::Renew, "renew", async move {
			let flight = {
				let mut inner = self.inner.lock();

				if let Some(flight) = inner.inflight.clone() {
					self.metrics.record_joined();
					tracing::debug!("Joining the renewal already in flight.");

					flight
				} else if let Some(outcome) = inner.settled_since(observed) {
					self.metrics.record_joined();
					tracing::debug!(success = outcome.is_ok(), "Joined a renewal that settled while waiting.");

					return outcome.map_err(Error::from);
				} else {
					let flight = self.launch();

					self.metrics.record_exchange();
					inner.state = SessionState::Authenticating;
					inner.inflight = Some(flight.clone());

					flight
				}
			};

			flight.await.map_err(Error::from)
		})
		.await
	}

	/// Builds the shared exchange future; it owns everything it touches and settles the state.
	fn launch(&self) -> Flight {
		let transport = self.transport.clone();
		let config = self.config.clone();
		let store = self.store.clone();
		let inspector = self.inspector.clone();
		let inner = self.inner.clone();
		let metrics = self.metrics.clone();
		let span = FlowSpan::new(FlowKind::Renew, "exchange");

		span.instrument(async move {
			let outcome =
				exchange(transport.as_ref(), &config, store.as_ref(), inspector.as_ref()).await;
			let mut inner = inner.lock();

			match &outcome {
				Ok(credential) => {
					inner.settle(SessionState::Authenticated(credential.clone()));
					metrics.record_success();
				},
				Err(failure) => {
					tracing::warn!(
						reason = %failure.reason,
						status = ?failure.status,
						"Login exchange failed."
					);
					inner.settle(SessionState::Failed(failure.clone()));
					metrics.record_failure();
				},
			}

			inner.inflight = None;

			outcome
		})
		.boxed()
		.shared()
	}
}
#[cfg(feature = "reqwest")]
impl SessionManager<ReqwestTransport> {
	/// Creates a manager that provisions its own reqwest-backed transport.
	pub fn new(config: SessionConfig, store: Arc<dyn CredentialStore>) -> Self {
		Self::with_transport(config, store, ReqwestTransport::default())
	}
}
impl<T> Debug for SessionManager<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SessionManager")
			.field("login_endpoint", &self.config.login_endpoint.as_str())
			.field("username", &self.config.username)
			.field("state", &self.inner.lock().state)
			.finish()
	}
}

async fn exchange<T>(
	transport: &T,
	config: &SessionConfig,
	store: &dyn CredentialStore,
	inspector: &dyn TokenInspector,
) -> Result<Credential, AuthenticationFailure>
where
	T: ?Sized + HttpTransport,
{
	let token = login::exchange(transport, config).await?;

	if !inspector.is_usable(token.expose(), OffsetDateTime::now_utc()) {
		return Err(AuthenticationFailure::new("issued token has no usable expiry claim"));
	}

	let credential = Credential::inspect(token, inspector);

	if let Err(e) = store.save(&credential).await {
		tracing::warn!(error = %e, "Failed to persist the renewed credential.");
	}

	Ok(credential)
}
