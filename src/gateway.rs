//! Authenticated request gateway.
//!
//! Every upstream API call goes through [`Gateway::call`]: it obtains a usable credential from
//! the [`SessionManager`], attaches it as a bearer header, executes the request, and interprets
//! HTTP 401 as a server-side rejection of that credential. A rejection triggers exactly one
//! renewal and surfaces [`Error::AuthenticationExpired`]. The request is never re-issued
//! automatically; retrying is the caller's decision.

pub mod request;

pub use request::*;

// crates.io
use ::http::StatusCode;
// self
use crate::{
	_prelude::*,
	error::{RequestFailure, TransportError},
	http::{HttpTransport, ResponseMetadata, body_preview},
	obs::{self, FlowKind},
	session::SessionManager,
};

/// Cloneable handle issuing authenticated calls on behalf of one session.
pub struct Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	session: Arc<SessionManager<T>>,
}
impl<T> Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	/// Creates a gateway bound to `session`.
	pub fn new(session: Arc<SessionManager<T>>) -> Self {
		Self { session }
	}

	/// Session backing this gateway.
	pub fn session(&self) -> &Arc<SessionManager<T>> {
		&self.session
	}

	/// Executes `request` with the current credential.
	///
	/// # Errors
	///
	/// - [`Error::Unauthenticated`] when no credential could be obtained; nothing is sent.
	/// - [`Error::AuthenticationExpired`] when the upstream answered 401; a renewal has already
	///   been attempted (its failure, if any, is the error's source) and the caller decides
	///   whether to re-issue the request.
	/// - [`Error::RequestFailure`] for any other transport failure or non-2xx status.
	pub async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
		let method = request.method.clone();
		let path = request.path.clone();

		obs::observe(FlowKind::Call, "call", async move {
			let credential = match self.session.get_valid_credential().await {
				Ok(credential) => credential,
				Err(Error::AuthenticationFailure(cause)) => {
					tracing::debug!(%method, %path, "Skipping call without a usable credential.");

					return Err(Error::Unauthenticated { cause });
				},
				Err(e) => return Err(e),
			};
			let http_request = request.into_http(&self.session.config().api_base, &credential)?;
			let response = self
				.session
				.transport()
				.execute(http_request)
				.await
				.map_err(|e| RequestFailure::from(TransportError::network(e)))?;
			let status = response.status();

			if status == StatusCode::UNAUTHORIZED {
				tracing::warn!(%method, %path, "Upstream rejected the session credential.");

				let renewal = match self.session.renew_rejected(&credential).await {
					Ok(_) => None,
					Err(Error::AuthenticationFailure(failure)) => Some(failure),
					Err(e) => return Err(e),
				};

				if let Some(failure) = &renewal {
					tracing::warn!(reason = %failure.reason, "Renewal after an upstream rejection failed.");
				}

				return Err(Error::AuthenticationExpired { renewal });
			}
			if !status.is_success() {
				let meta = ResponseMetadata::from_response(&response);

				tracing::debug!(%method, %path, status = status.as_u16(), "Upstream call failed.");

				return Err(RequestFailure::Status {
					status: status.as_u16(),
					retry_after: meta.retry_after,
					body_preview: body_preview(response.body()),
				}
				.into());
			}

			Ok(ApiResponse::from(response))
		})
		.await
	}

	/// Executes `request` and decodes the JSON body as `R`.
	pub async fn call_json<R>(&self, request: ApiRequest) -> Result<R>
	where
		R: DeserializeOwned,
	{
		self.call(request).await?.json()
	}
}
impl<T> Clone for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { session: self.session.clone() }
	}
}
impl<T> Debug for Gateway<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Gateway").field("session", &self.session).finish()
	}
}
