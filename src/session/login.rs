//! Password-grant login exchange against the identity endpoint.

// crates.io
use ::http::{
	Method, Request,
	header::{ACCEPT, CONTENT_TYPE},
};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::Secret,
	config::SessionConfig,
	error::AuthenticationFailure,
	http::{HttpRequest, HttpResponse, HttpTransport, body_preview, is_json},
};

const GRANT_TYPE: &str = "password";

/// Successful login payload; upstreams name the token field either way.
#[derive(Debug, Deserialize)]
struct LoginResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	token: Option<String>,
}

/// Error payload fields commonly returned by identity endpoints.
#[derive(Debug, Default, Deserialize)]
struct LoginErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	detail: Option<serde_json::Value>,
}
impl LoginErrorBody {
	fn summary(self) -> Option<String> {
		let detail = self.detail.map(|value| match value {
			serde_json::Value::String(text) => text,
			other => other.to_string(),
		});

		self.error_description
			.or(self.error)
			.or(self.message)
			.or(detail)
			.filter(|text| !text.trim().is_empty())
	}
}

/// Performs one login exchange and returns the issued token.
pub(crate) async fn exchange<T>(
	transport: &T,
	config: &SessionConfig,
) -> Result<Secret, AuthenticationFailure>
where
	T: ?Sized + HttpTransport,
{
	let request = build_request(config)?;
	let response = transport
		.execute(request)
		.await
		.map_err(|e| AuthenticationFailure::new(format!("identity endpoint is unreachable: {e}")))?;

	parse_response(&response)
}

fn build_request(config: &SessionConfig) -> Result<HttpRequest, AuthenticationFailure> {
	let body = Serializer::new(String::new())
		.append_pair("grant_type", GRANT_TYPE)
		.append_pair("username", &config.username)
		.append_pair("password", config.password.expose())
		.finish();

	Request::builder()
		.method(Method::POST)
		.uri(config.login_endpoint.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
		.map_err(|e| AuthenticationFailure::new(format!("login request could not be built: {e}")))
}

fn parse_response(response: &HttpResponse) -> Result<Secret, AuthenticationFailure> {
	let status = response.status();

	if !status.is_success() {
		return Err(rejection(response));
	}

	let mut de = serde_json::Deserializer::from_slice(response.body());
	let parsed: LoginResponse = serde_path_to_error::deserialize(&mut de).map_err(|e| {
		AuthenticationFailure::new(format!(
			"login response is malformed at `{}`: {}",
			e.path(),
			e.inner()
		))
		.with_status(status.as_u16())
	})?;

	parsed
		.access_token
		.into_iter()
		.chain(parsed.token)
		.find(|token| !token.trim().is_empty())
		.map(Secret::new)
		.ok_or_else(|| {
			AuthenticationFailure::new("token missing from login response")
				.with_status(status.as_u16())
		})
}

fn rejection(response: &HttpResponse) -> AuthenticationFailure {
	let status = response.status();
	let structured = if is_json(response.headers()) {
		serde_json::from_slice::<LoginErrorBody>(response.body())
			.ok()
			.and_then(LoginErrorBody::summary)
	} else {
		None
	};
	let detail = structured
		.or_else(|| body_preview(response.body()))
		.unwrap_or_else(|| "no details provided".into());

	AuthenticationFailure::new(format!(
		"identity endpoint rejected the login with HTTP {}: {detail}",
		status.as_u16()
	))
	.with_status(status.as_u16())
}
