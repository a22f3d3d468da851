//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	io::{Error as IoError, ErrorKind},
	sync::atomic::{AtomicUsize, Ordering},
};
// crates.io
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{Response, StatusCode};
use parking_lot::Mutex;
use time::{Duration, OffsetDateTime};
// self
use console_session::{
	config::SessionConfig,
	http::{HttpRequest, HttpTransport, TransportFuture},
};

pub const OPERATOR: &str = "console-admin";
pub const PASSWORD: &str = "operator-password";

/// Builds a JWT-shaped token whose payload carries `exp`.
pub fn jwt_expiring_at(instant: OffsetDateTime) -> String {
	jwt_with_segments("header", instant, "signature")
}

pub fn jwt_expiring_in(lifetime: Duration) -> String {
	jwt_expiring_at(OffsetDateTime::now_utc() + lifetime)
}

pub fn jwt_with_segments(head: &str, instant: OffsetDateTime, tail: &str) -> String {
	let payload = format!(r#"{{"sub":"{OPERATOR}","exp":{}}}"#, instant.unix_timestamp());

	format!("{head}.{}.{tail}", URL_SAFE_NO_PAD.encode(payload))
}

pub fn login_body(token: &str) -> String {
	format!(r#"{{"access_token":"{token}","token_type":"bearer"}}"#)
}

/// Configuration pointing at a plain-HTTP mock server.
pub fn config_for(base_url: &str) -> SessionConfig {
	SessionConfig::builder()
		.login_endpoint_str(&format!("{base_url}/api/v1/auth/login"))
		.api_base_str(&format!("{base_url}/api/v1"))
		.operator(OPERATOR, PASSWORD)
		.allow_insecure_http(true)
		.build()
		.expect("Mock server configuration should build.")
}

/// Scripted reply of [`FakeIdentity`].
#[derive(Clone, Debug)]
pub enum Reply {
	Token(String),
	Status(u16, String),
	Unreachable,
}

/// Identity endpoint double that counts exchanges and answers after a short delay.
///
/// Replies are consumed in order; the last one repeats forever.
pub struct FakeIdentity {
	calls: AtomicUsize,
	replies: Mutex<VecDeque<Reply>>,
	latency: std::time::Duration,
}
impl FakeIdentity {
	pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
		Self {
			calls: AtomicUsize::new(0),
			replies: Mutex::new(replies.into_iter().collect()),
			latency: std::time::Duration::from_millis(50),
		}
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	fn next_reply(&self) -> Reply {
		let mut replies = self.replies.lock();

		if replies.len() > 1 {
			replies.pop_front().unwrap_or(Reply::Unreachable)
		} else {
			replies.front().cloned().unwrap_or(Reply::Unreachable)
		}
	}
}
impl HttpTransport for FakeIdentity {
	type TransportError = IoError;

	fn execute(&self, request: HttpRequest) -> TransportFuture<'_, Self::TransportError> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let reply = self.next_reply();
		let latency = self.latency;

		Box::pin(async move {
			assert!(
				request.uri().path().ends_with("/auth/login"),
				"Only the login endpoint should be reached, got {}.",
				request.uri()
			);

			tokio::time::sleep(latency).await;

			let (status, body) = match reply {
				Reply::Token(token) => (200, login_body(&token)),
				Reply::Status(status, body) => (status, body),
				Reply::Unreachable =>
					return Err(IoError::new(ErrorKind::ConnectionRefused, "identity endpoint down")),
			};
			let mut response = Response::new(body.into_bytes());

			*response.status_mut() =
				StatusCode::from_u16(status).expect("Scripted status should be valid.");

			Ok(response)
		})
	}
}
