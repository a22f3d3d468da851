mod common;

// std
use std::sync::Arc;
// crates.io
use httpmock::prelude::*;
use time::Duration;
// self
use console_session::{
	config::SessionConfig,
	error::{Error, RequestFailure},
	gateway::{ApiRequest, Gateway},
	http::ReqwestTransport,
	session::{ReqwestSessionManager, SessionState},
	store::MemoryStore,
};

fn gateway_for(server: &MockServer) -> (Gateway<ReqwestTransport>, MemoryStore) {
	let store = MemoryStore::default();
	let session = ReqwestSessionManager::new(
		common::config_for(&server.base_url()),
		Arc::new(store.clone()),
	);

	(Gateway::new(Arc::new(session)), store)
}

#[tokio::test]
async fn call_attaches_the_bearer_credential() {
	let server = MockServer::start_async().await;
	let token = common::jwt_expiring_in(Duration::hours(1));
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/v1/auth/login")
				.header("content-type", "application/x-www-form-urlencoded");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&token));
		})
		.await;
	let users = server
		.mock_async(|when, then| {
			when.method(GET)
				.path("/api/v1/users")
				.query_param("page", "1")
				.header("authorization", format!("Bearer {token}"));
			then.status(200).header("content-type", "application/json").body(r#"{"data":[]}"#);
		})
		.await;
	let (gateway, _) = gateway_for(&server);

	for _ in 0..2 {
		let body: serde_json::Value = gateway
			.call_json(ApiRequest::get("/users").with_query("page", 1))
			.await
			.expect("Authorized call should succeed.");

		assert_eq!(body["data"], serde_json::json!([]));
	}

	login.assert_calls_async(1).await;
	users.assert_calls_async(2).await;
}

#[tokio::test]
async fn upstream_rejection_surfaces_expired_and_renews_once() {
	let server = MockServer::start_async().await;
	let token = common::jwt_expiring_in(Duration::hours(1));
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&token));
		})
		.await;
	let projects = server
		.mock_async(|when, then| {
			when.method(DELETE).path("/api/v1/projects/p-1");
			then.status(401).body(r#"{"detail":"token revoked"}"#);
		})
		.await;
	let (gateway, _) = gateway_for(&server);
	let err = gateway
		.call(ApiRequest::delete("/projects/p-1"))
		.await
		.expect_err("Rejected credential should surface an error.");

	assert!(matches!(err, Error::AuthenticationExpired { renewal: None }));
	assert!(err.is_retryable());
	assert!(gateway.session().state().is_authenticated());

	projects.assert_calls_async(1).await;
	login.assert_calls_async(2).await;
	assert_eq!(gateway.session().metrics.exchanges(), 2);
}

#[tokio::test]
async fn back_to_back_calls_after_expiry_share_one_renewal() {
	let server = MockServer::start_async().await;
	let short_lived = common::jwt_expiring_in(Duration::seconds(2));
	let renewed = common::jwt_expiring_in(Duration::hours(1));
	let mut first_login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&short_lived));
		})
		.await;
	let (gateway, _) = gateway_for(&server);

	gateway.session().get_valid_credential().await.expect("Initial login should succeed.");
	first_login.assert_calls_async(1).await;
	first_login.delete_async().await;

	let second_login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&renewed))
				.delay(std::time::Duration::from_millis(100));
		})
		.await;
	let groups = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/groups").header("authorization", format!("Bearer {renewed}"));
			then.status(200).header("content-type", "application/json").body(r#"{"data":[]}"#);
		})
		.await;

	tokio::time::sleep(std::time::Duration::from_millis(2_500)).await;

	let (a, b) = tokio::join!(
		gateway.call(ApiRequest::get("/groups")),
		gateway.call(ApiRequest::get("/groups"))
	);

	a.expect("First call should use the renewed credential.");
	b.expect("Second call should use the renewed credential.");
	second_login.assert_calls_async(1).await;
	groups.assert_calls_async(2).await;
}

#[tokio::test]
async fn concurrent_rejections_of_one_credential_renew_once() {
	let server = MockServer::start_async().await;
	let revoked = common::jwt_expiring_in(Duration::hours(1));
	let renewed = common::jwt_expiring_in(Duration::hours(2));
	let mut first_login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&revoked));
		})
		.await;
	let (gateway, store) = gateway_for(&server);

	gateway.session().get_valid_credential().await.expect("Initial login should succeed.");
	first_login.assert_calls_async(1).await;
	first_login.delete_async().await;

	let second_login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&renewed))
				.delay(std::time::Duration::from_millis(100));
		})
		.await;
	let projects = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/projects").header("authorization", format!("Bearer {revoked}"));
			then.status(401).body(r#"{"detail":"token revoked"}"#);
		})
		.await;
	let (a, b) = tokio::join!(
		gateway.call(ApiRequest::get("/projects")),
		gateway.call(ApiRequest::get("/projects"))
	);

	for outcome in [a, b] {
		let err = outcome.expect_err("Both calls carried the revoked credential.");

		assert!(matches!(err, Error::AuthenticationExpired { renewal: None }), "{err:?}");
	}

	projects.assert_calls_async(2).await;
	second_login.assert_calls_async(1).await;
	assert_eq!(gateway.session().metrics.exchanges(), 2);
	assert_eq!(
		gateway.session().state().credential().map(|credential| credential.token.expose().to_owned()),
		Some(renewed.clone())
	);
	assert_eq!(store.snapshot().as_ref().map(|token| token.expose().to_owned()), Some(renewed));
}

#[tokio::test]
async fn failed_renewal_after_rejection_is_the_expiry_source() {
	let server = MockServer::start_async().await;
	let token = common::jwt_expiring_in(Duration::hours(1));
	let mut first_login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&token));
		})
		.await;
	let (gateway, _) = gateway_for(&server);

	gateway.session().get_valid_credential().await.expect("Initial login should succeed.");
	first_login.delete_async().await;
	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"Account disabled"}"#);
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v1/users");
			then.status(401);
		})
		.await;

	let err = gateway.call(ApiRequest::get("/users")).await.expect_err("Rejected call should fail.");
	let source = std::error::Error::source(&err)
		.expect("The failed renewal should be attached to the expiry error.");

	match &err {
		Error::AuthenticationExpired { renewal: Some(failure) } => {
			assert_eq!(failure.status, Some(401));
			assert!(failure.reason.contains("Account disabled"), "{}", failure.reason);
			assert_eq!(source.to_string(), failure.to_string());
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(err.is_retryable());
	assert!(matches!(gateway.session().state(), SessionState::Failed(_)));
}

#[tokio::test]
async fn failed_login_never_reaches_the_api() {
	let server = MockServer::start_async().await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#);
		})
		.await;
	let users = server
		.mock_async(|when, then| {
			when.path("/api/v1/users");
			then.status(200).body(r#"{"data":[]}"#);
		})
		.await;
	let (gateway, store) = gateway_for(&server);
	let err = gateway
		.call(ApiRequest::get("/users"))
		.await
		.expect_err("Call without a credential should fail.");

	match err {
		Error::Unauthenticated { cause } => {
			assert_eq!(cause.status, Some(401));
			assert!(cause.reason.contains("Invalid user credentials"), "{}", cause.reason);
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	login.assert_calls_async(1).await;
	users.assert_calls_async(0).await;
	assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn other_statuses_pass_through_as_request_failures() {
	let server = MockServer::start_async().await;
	let token = common::jwt_expiring_in(Duration::hours(1));
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&token));
		})
		.await;
	server
		.mock_async(|when, then| {
			when.method(PUT).path("/api/v1/resources/task_policy");
			then.status(503).header("retry-after", "7").body("maintenance window");
		})
		.await;
	let (gateway, _) = gateway_for(&server);
	let request = ApiRequest::put("/resources/task_policy")
		.with_json(&serde_json::json!({ "cpu": "4" }))
		.expect("JSON body should encode.");
	let err = gateway.call(request).await.expect_err("HTTP 503 should fail the call.");

	match err {
		Error::RequestFailure(RequestFailure::Status { status, retry_after, body_preview }) => {
			assert_eq!(status, 503);
			assert_eq!(retry_after, Some(Duration::seconds(7)));
			assert_eq!(body_preview.as_deref(), Some("maintenance window"));
		},
		other => panic!("Unexpected error: {other:?}."),
	}

	assert!(gateway.session().state().credential().is_some());
	login.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_failure() {
	let server = MockServer::start_async().await;
	let token = common::jwt_expiring_in(Duration::hours(1));

	server
		.mock_async(|when, then| {
			when.method(POST).path("/api/v1/auth/login");
			then.status(200)
				.header("content-type", "application/json")
				.body(common::login_body(&token));
		})
		.await;

	let config = SessionConfig::builder()
		.login_endpoint_str(&server.url("/api/v1/auth/login"))
		.api_base_str("http://127.0.0.1:9/api/v1")
		.operator(common::OPERATOR, common::PASSWORD)
		.allow_insecure_http(true)
		.build()
		.expect("Configuration with a closed API port should build.");
	let session = ReqwestSessionManager::new(config, Arc::new(MemoryStore::default()));
	let gateway = Gateway::new(Arc::new(session));
	let err = gateway.call(ApiRequest::get("/users")).await.expect_err("Closed port should fail.");

	assert!(
		matches!(err, Error::RequestFailure(RequestFailure::Transport(_))),
		"Unexpected error: {err:?}."
	);
	assert!(!err.is_retryable());
}
