//! Session-wide error taxonomy shared by the store, session manager, and gateway.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// UI layers should treat [`Error::Unauthenticated`] and [`Error::AuthenticationExpired`] as
/// "please retry" conditions and [`Error::RequestFailure`] as the specific operation failing.
#[derive(Debug, ThisError)]
pub enum Error {
	/// The identity exchange itself failed; every caller waiting on that exchange receives it.
	#[error(transparent)]
	AuthenticationFailure(#[from] AuthenticationFailure),
	/// No credential could be obtained, so the request was never sent.
	#[error("No usable credential is available.")]
	Unauthenticated {
		/// Failure of the renewal that was attempted on the caller's behalf.
		#[source]
		cause: AuthenticationFailure,
	},
	/// The upstream rejected the credential at call time; a renewal has been triggered and the
	/// caller decides whether to re-issue the request.
	#[error("The upstream rejected the session credential; re-issue the request to retry.")]
	AuthenticationExpired {
		/// Failure of the renewal triggered by the rejection, if it did not succeed.
		#[source]
		renewal: Option<AuthenticationFailure>,
	},
	/// Any other transport or HTTP failure, passed through unchanged.
	#[error(transparent)]
	RequestFailure(#[from] RequestFailure),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] crate::config::SessionConfigError),
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
}
impl Error {
	/// Returns `true` when the caller may simply re-issue the operation.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Unauthenticated { .. } | Self::AuthenticationExpired { .. })
	}
}

/// Outcome of a failed login exchange.
///
/// The value is cheap to clone so one failure can be handed to every caller that joined the
/// same single-flight renewal.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Authentication failed: {reason}.")]
pub struct AuthenticationFailure {
	/// Human-readable cause (network failure, rejected credentials, malformed response).
	pub reason: String,
	/// HTTP status returned by the identity endpoint, when one was received.
	pub status: Option<u16>,
}
impl AuthenticationFailure {
	/// Builds a failure without an HTTP status.
	pub fn new(reason: impl Into<String>) -> Self {
		Self { reason: reason.into(), status: None }
	}

	/// Attaches the identity endpoint's HTTP status.
	pub fn with_status(mut self, status: u16) -> Self {
		self.status = Some(status);

		self
	}
}

/// Failures of an individual upstream API call that are unrelated to the session credential.
#[derive(Debug, ThisError)]
pub enum RequestFailure {
	/// Upstream answered with a non-success status other than 401.
	#[error("Upstream API responded with HTTP {status}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
		/// Truncated response body for diagnostics.
		body_preview: Option<String>,
	},
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body did not match the expected shape.
	#[error("Upstream API returned a body that could not be decoded.")]
	Decode {
		/// Structured parsing failure naming the offending JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status of the response.
		status: u16,
	},
	/// Request payload could not be serialized.
	#[error("Request body could not be encoded.")]
	Encode(#[source] serde_json::Error),
	/// Request could not be assembled.
	#[error(transparent)]
	Build(#[from] http::Error),
	/// Header value contained bytes that cannot be sent.
	#[error(transparent)]
	InvalidHeader(#[from] http::header::InvalidHeaderValue),
	/// Request path did not produce a valid URL.
	#[error("Request URL `{url}` is invalid.")]
	InvalidUrl {
		/// Offending URL string.
		url: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the upstream.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the upstream.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
