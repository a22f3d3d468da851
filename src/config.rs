//! Deployment configuration for the session core.
//!
//! Operator credentials are fixed per deployment rather than supplied by end users, so they are
//! part of the validated [`SessionConfig`] alongside the identity endpoint and API base path.

// self
use crate::{_prelude::*, auth::Secret};

/// Storage key under which the bearer token is persisted.
pub const DEFAULT_STORAGE_KEY: &str = "auth_token";

/// Errors raised while constructing or validating a [`SessionConfig`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum SessionConfigError {
	/// Login endpoint is mandatory.
	#[error("Missing login endpoint.")]
	MissingLoginEndpoint,
	/// API base path is mandatory.
	#[error("Missing API base URL.")]
	MissingApiBase,
	/// Endpoints must use HTTPS unless explicitly allowed.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Endpoint URL could not be parsed.
	#[error("The {endpoint} endpoint is not a valid URL: {url}.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Offending input.
		url: String,
	},
	/// Operator username or password is missing.
	#[error("Operator credentials must include a non-empty {field}.")]
	EmptyCredential {
		/// Name of the empty field.
		field: &'static str,
	},
	/// Storage key must not be blank.
	#[error("Storage key must not be empty.")]
	EmptyStorageKey,
}

/// Immutable, validated configuration consumed by the session manager and gateway.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
	/// Identity endpoint receiving the form-encoded password grant.
	pub login_endpoint: Url,
	/// Base URL prefixed to every gateway request path.
	pub api_base: Url,
	/// Operator username.
	pub username: String,
	/// Operator password.
	pub password: Secret,
	/// Key under which the credential store persists the token.
	pub storage_key: String,
	/// Tokens are treated as stale this long before their embedded expiry.
	pub expiry_leeway: Duration,
}
impl SessionConfig {
	/// Creates a new builder.
	pub fn builder() -> SessionConfigBuilder {
		SessionConfigBuilder::default()
	}

	fn validate(&self, allow_insecure_http: bool) -> Result<(), SessionConfigError> {
		if !allow_insecure_http {
			for (endpoint, url) in [("login", &self.login_endpoint), ("api_base", &self.api_base)] {
				if url.scheme() != "https" {
					return Err(SessionConfigError::InsecureEndpoint {
						endpoint,
						url: url.to_string(),
					});
				}
			}
		}
		if self.username.trim().is_empty() {
			return Err(SessionConfigError::EmptyCredential { field: "username" });
		}
		if self.password.is_blank() {
			return Err(SessionConfigError::EmptyCredential { field: "password" });
		}
		if self.storage_key.trim().is_empty() {
			return Err(SessionConfigError::EmptyStorageKey);
		}

		Ok(())
	}
}

/// Builder for [`SessionConfig`] values.
#[derive(Debug, Default)]
pub struct SessionConfigBuilder {
	login_endpoint: Option<Url>,
	api_base: Option<Url>,
	username: String,
	password: Option<Secret>,
	storage_key: Option<String>,
	expiry_leeway: Duration,
	allow_insecure_http: bool,
	error: Option<SessionConfigError>,
}
impl SessionConfigBuilder {
	/// Sets the identity endpoint.
	pub fn login_endpoint(mut self, url: Url) -> Self {
		self.login_endpoint = Some(url);

		self
	}

	/// Parses and sets the identity endpoint.
	pub fn login_endpoint_str(self, url: &str) -> Self {
		match Url::parse(url) {
			Ok(parsed) => self.login_endpoint(parsed),
			Err(_) =>
				self.fail(SessionConfigError::InvalidEndpoint { endpoint: "login", url: url.into() }),
		}
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Parses and sets the API base URL.
	pub fn api_base_str(self, url: &str) -> Self {
		match Url::parse(url) {
			Ok(parsed) => self.api_base(parsed),
			Err(_) =>
				self.fail(SessionConfigError::InvalidEndpoint { endpoint: "api_base", url: url.into() }),
		}
	}

	/// Sets the operator credentials used by every login exchange.
	pub fn operator(mut self, username: impl Into<String>, password: impl Into<Secret>) -> Self {
		self.username = username.into();
		self.password = Some(password.into());

		self
	}

	/// Overrides the storage key (defaults to [`DEFAULT_STORAGE_KEY`]).
	pub fn storage_key(mut self, key: impl Into<String>) -> Self {
		self.storage_key = Some(key.into());

		self
	}

	/// Treats tokens as stale `leeway` before their embedded expiry (defaults to zero).
	pub fn expiry_leeway(mut self, leeway: Duration) -> Self {
		self.expiry_leeway = if leeway.is_negative() { Duration::ZERO } else { leeway };

		self
	}

	/// Permits plain-HTTP endpoints, e.g. for local mock servers.
	pub fn allow_insecure_http(mut self, allow: bool) -> Self {
		self.allow_insecure_http = allow;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SessionConfig, SessionConfigError> {
		if let Some(e) = self.error {
			return Err(e);
		}

		let login_endpoint =
			self.login_endpoint.ok_or(SessionConfigError::MissingLoginEndpoint)?;
		let api_base = self.api_base.ok_or(SessionConfigError::MissingApiBase)?;
		let config = SessionConfig {
			login_endpoint,
			api_base,
			username: self.username,
			password: self.password.unwrap_or_else(|| Secret::new("")),
			storage_key: self.storage_key.unwrap_or_else(|| DEFAULT_STORAGE_KEY.into()),
			expiry_leeway: self.expiry_leeway,
		};

		config.validate(self.allow_insecure_http)?;

		Ok(config)
	}

	fn fail(mut self, error: SessionConfigError) -> Self {
		self.error.get_or_insert(error);

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn base() -> SessionConfigBuilder {
		SessionConfig::builder()
			.login_endpoint_str("https://console.example.com/api/v1/auth/login")
			.api_base_str("https://console.example.com/api/v1")
			.operator("admin", "operator-password")
	}

	#[test]
	fn builder_applies_defaults() {
		let config = base().build().expect("Secure configuration should build.");

		assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
		assert_eq!(config.expiry_leeway, Duration::ZERO);
		assert_eq!(config.username, "admin");
		assert_eq!(config.password.expose(), "operator-password");
		assert!(!format!("{config:?}").contains("operator-password"));
	}

	#[test]
	fn builder_rejects_insecure_endpoints_unless_allowed() {
		let err = base()
			.api_base_str("http://localhost:8080/api/v1")
			.build()
			.expect_err("Plain-HTTP API base should be rejected by default.");

		assert!(matches!(err, SessionConfigError::InsecureEndpoint { endpoint: "api_base", .. }));

		base()
			.api_base_str("http://localhost:8080/api/v1")
			.allow_insecure_http(true)
			.build()
			.expect("Plain-HTTP API base should build when explicitly allowed.");
	}

	#[test]
	fn builder_reports_missing_and_invalid_fields() {
		let err = SessionConfig::builder()
			.api_base_str("https://console.example.com")
			.operator("admin", "pw")
			.build()
			.expect_err("Missing login endpoint should fail.");

		assert_eq!(err, SessionConfigError::MissingLoginEndpoint);

		let err = base().login_endpoint_str("not a url").build().expect_err("Bad URL should fail.");

		assert!(matches!(err, SessionConfigError::InvalidEndpoint { endpoint: "login", .. }));

		let err = base().operator("admin", " ").build().expect_err("Blank password should fail.");

		assert_eq!(err, SessionConfigError::EmptyCredential { field: "password" });

		let err = base().storage_key("").build().expect_err("Blank storage key should fail.");

		assert_eq!(err, SessionConfigError::EmptyStorageKey);
	}
}
