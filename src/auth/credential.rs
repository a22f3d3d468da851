//! The bearer credential cached by the session manager.

// self
use crate::{
	_prelude::*,
	auth::{Secret, TokenInspector},
};

/// Lifecycle status of a [`Credential`] at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialStatus {
	/// The embedded expiry lies in the future.
	Active,
	/// The embedded expiry has passed.
	Expired,
	/// The token carries no decodable expiry; treated exactly like [`CredentialStatus::Expired`].
	Unknown,
}

/// Bearer credential sent on every outbound request.
///
/// Created by a successful login exchange (or adopted from the credential store), read on every
/// gateway call, and replaced wholesale on renewal.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
	/// Opaque bearer value; callers must avoid logging it.
	pub token: Secret,
	/// Instant derived from the token's embedded expiry claim, if it could be decoded.
	pub expires_at: Option<OffsetDateTime>,
	/// Instant at which this process obtained the credential.
	pub obtained_at: OffsetDateTime,
}
impl Credential {
	/// Wraps a token with an already-decoded expiry.
	pub fn new(token: impl Into<Secret>, expires_at: Option<OffsetDateTime>) -> Self {
		Self { token: token.into(), expires_at, obtained_at: OffsetDateTime::now_utc() }
	}

	/// Wraps a token, decoding its expiry with the provided inspector.
	pub fn inspect(token: impl Into<Secret>, inspector: &dyn TokenInspector) -> Self {
		let token = token.into();
		let expires_at = inspector.expires_at(token.expose());

		Self::new(token, expires_at)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> CredentialStatus {
		match self.expires_at {
			None => CredentialStatus::Unknown,
			Some(expires_at) if instant < expires_at => CredentialStatus::Active,
			Some(_) => CredentialStatus::Expired,
		}
	}

	/// Remaining lifetime at `instant`, or `None` when expired or undecodable.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Option<Duration> {
		self.expires_at.map(|expires_at| expires_at - instant).filter(|left| left.is_positive())
	}

	/// Formats the `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.token.expose())
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("obtained_at", &self.obtained_at)
			.finish()
	}
}
