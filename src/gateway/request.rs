//! Outbound request descriptor and buffered response handed back by the gateway.

// crates.io
use ::http::{
	HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode,
	header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::RequestFailure,
	http::{HttpRequest, HttpResponse},
};

/// Caller-owned description of one upstream API call.
///
/// `path` is relative to [`crate::config::SessionConfig::api_base`]. The gateway consumes the
/// descriptor, adds the `Authorization` header, and does not retain it after the call.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Path appended to the API base, e.g. `/users`.
	pub path: String,
	/// Query pairs appended after any query already present in `path`.
	pub query: Vec<(String, String)>,
	/// Caller-supplied headers; `Authorization` is always replaced.
	pub headers: HeaderMap,
	/// Request body, if any.
	pub body: Option<Vec<u8>>,
}
impl ApiRequest {
	/// Creates a request with no body, headers, or query.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), query: Vec::new(), headers: HeaderMap::new(), body: None }
	}

	/// `GET path`.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// `POST path`.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// `PUT path`.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::PUT, path)
	}

	/// `DELETE path`.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::DELETE, path)
	}

	/// Adds or replaces a header.
	pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Appends a query pair.
	pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
		self.query.push((key.into(), value.to_string()));

		self
	}

	/// Serializes `body` as the JSON payload.
	pub fn with_json<B>(mut self, body: &B) -> Result<Self, RequestFailure>
	where
		B: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(RequestFailure::Encode)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Resolves the absolute URL against `base`.
	///
	/// The path is appended to the base path verbatim, so `/users` under
	/// `https://host/api/v1` targets `https://host/api/v1/users`.
	pub fn url(&self, base: &Url) -> Result<Url, RequestFailure> {
		let joined = format!(
			"{}/{}",
			base.as_str().trim_end_matches('/'),
			self.path.trim_start_matches('/')
		);
		let mut url = Url::parse(&joined)
			.map_err(|source| RequestFailure::InvalidUrl { url: joined.clone(), source })?;

		if !self.query.is_empty() {
			url.query_pairs_mut().extend_pairs(&self.query);
		}

		Ok(url)
	}

	pub(crate) fn into_http(
		self,
		base: &Url,
		credential: &Credential,
	) -> Result<HttpRequest, RequestFailure> {
		let url = self.url(base)?;
		let mut authorization = HeaderValue::from_str(&credential.bearer())?;

		authorization.set_sensitive(true);

		let mut headers = self.headers;

		headers.insert(AUTHORIZATION, authorization);
		headers.entry(ACCEPT).or_insert_with(|| HeaderValue::from_static("application/json"));

		let mut request = Request::builder()
			.method(self.method)
			.uri(url.as_str())
			.body(self.body.unwrap_or_default())?;

		*request.headers_mut() = headers;

		Ok(request)
	}
}

/// Fully buffered response of a successful call.
#[derive(Clone, Debug)]
pub struct ApiResponse {
	/// HTTP status (always 2xx when returned by the gateway).
	pub status: StatusCode,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Decodes the body as JSON; an empty body decodes as `null`.
	pub fn json<T>(&self) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) { b"null" } else { &self.body };
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de).map_err(|source| {
			RequestFailure::Decode { source, status: self.status.as_u16() }.into()
		})
	}

	/// Returns the body as text, replacing invalid UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
impl From<HttpResponse> for ApiResponse {
	fn from(response: HttpResponse) -> Self {
		let (parts, body) = response.into_parts();

		Self { status: parts.status, headers: parts.headers, body }
	}
}
