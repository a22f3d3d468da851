//! Local expiry inspection of bearer tokens.
//!
//! The inspector decodes the `exp` claim from the JWS payload segment without verifying the
//! signature. Anything that cannot be decoded is reported as "not usable" so a credential that
//! cannot be validated is never sent. Decoding errors never escape this module.

// crates.io
use base64::{
	Engine,
	engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD},
};
// self
use crate::_prelude::*;

/// Answers whether a cached token is still usable.
///
/// Implementations must never panic or fail on untrusted input; undecodable tokens yield `None`
/// from [`TokenInspector::expires_at`] and `false` from [`TokenInspector::is_usable`].
pub trait TokenInspector
where
	Self: Send + Sync,
{
	/// Decodes the token's embedded expiry instant.
	fn expires_at(&self, token: &str) -> Option<OffsetDateTime>;

	/// Returns `true` only when the expiry could be decoded and `now` lies before it.
	fn is_usable(&self, token: &str, now: OffsetDateTime) -> bool {
		self.expires_at(token).is_some_and(|expires_at| now < expires_at)
	}
}

/// Default inspector reading the `exp` claim of a JWT-shaped token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JwtExpiryInspector {
	leeway: Duration,
}
impl JwtExpiryInspector {
	/// Treats tokens as stale `leeway` before their embedded expiry.
	pub fn with_leeway(leeway: Duration) -> Self {
		Self { leeway: if leeway.is_negative() { Duration::ZERO } else { leeway } }
	}

	/// Returns the configured leeway.
	pub fn leeway(&self) -> Duration {
		self.leeway
	}
}
impl TokenInspector for JwtExpiryInspector {
	fn expires_at(&self, token: &str) -> Option<OffsetDateTime> {
		match decode_expiry(token) {
			Ok(instant) => Some(instant),
			Err(e) => {
				tracing::debug!(error = %e, "Token expiry could not be decoded.");

				None
			},
		}
	}

	fn is_usable(&self, token: &str, now: OffsetDateTime) -> bool {
		let Some(deadline) = now.checked_add(self.leeway) else {
			return false;
		};

		self.expires_at(token).is_some_and(|expires_at| deadline < expires_at)
	}
}

#[derive(Debug, ThisError)]
enum ClaimError {
	#[error("token does not have three dot-separated segments")]
	Segments,
	#[error("payload segment is not valid base64")]
	Base64,
	#[error("payload segment is not a JSON object with a numeric exp claim: {0}")]
	Claims(#[from] serde_json::Error),
	#[error("exp claim is outside the representable range")]
	OutOfRange,
}

#[derive(Deserialize)]
struct ExpiryClaims {
	exp: serde_json::Number,
}

fn decode_expiry(token: &str) -> Result<OffsetDateTime, ClaimError> {
	let mut segments = token.trim().split('.');
	let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
		(Some(_), Some(payload), Some(_), None) if !payload.is_empty() => payload,
		_ => return Err(ClaimError::Segments),
	};
	let trimmed = payload.trim_end_matches('=');
	let bytes = URL_SAFE_NO_PAD
		.decode(trimmed)
		.or_else(|_| STANDARD_NO_PAD.decode(trimmed))
		.map_err(|_| ClaimError::Base64)?;
	let claims: ExpiryClaims = serde_json::from_slice(&bytes)?;
	let seconds = match claims.exp.as_i64() {
		Some(seconds) => seconds,
		None => claims
			.exp
			.as_f64()
			.filter(|value| value.is_finite() && value.abs() < i64::MAX as f64)
			.map(|value| value.floor() as i64)
			.ok_or(ClaimError::OutOfRange)?,
	};

	OffsetDateTime::from_unix_timestamp(seconds).map_err(|_| ClaimError::OutOfRange)
}
