//! Typed calls against the upstream admin API.
//!
//! [`ConsoleClient`] only shapes requests and decodes responses; all authentication and error
//! semantics come from the wrapped [`Gateway`].

pub mod models;

pub use models::*;

// crates.io
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	gateway::{ApiRequest, Gateway},
	http::HttpTransport,
};

/// Typed client for the console's upstream API.
pub struct ConsoleClient<T>
where
	T: ?Sized + HttpTransport,
{
	gateway: Gateway<T>,
}
impl<T> ConsoleClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Wraps `gateway`.
	pub fn new(gateway: Gateway<T>) -> Self {
		Self { gateway }
	}

	/// Underlying gateway, for calls not modeled here.
	pub fn gateway(&self) -> &Gateway<T> {
		&self.gateway
	}

	/// `GET /users`.
	pub async fn list_users(&self, page: PageRequest) -> Result<DataEnvelope<Vec<User>>> {
		self.gateway.call_json(page.apply(ApiRequest::get("/users"))).await
	}

	/// `GET /users/{id}/role-mappings`.
	pub async fn user_role_mappings(
		&self,
		user_id: &str,
		page: PageRequest,
	) -> Result<DataEnvelope<Vec<RoleAssignment>>> {
		let path = format!("/users/{}/role-mappings", segment(user_id));

		self.gateway.call_json(page.apply(ApiRequest::get(path))).await
	}

	/// `GET /users/{id}/role-available`: roles the user may still be granted.
	pub async fn available_roles(&self, user_id: &str) -> Result<Vec<RoleAssignment>> {
		let path = format!("/users/{}/role-available", segment(user_id));
		let envelope: DataEnvelope<Vec<RoleAssignment>> =
			self.gateway.call_json(ApiRequest::get(path)).await?;

		Ok(envelope.data)
	}

	/// `GET /groups`.
	pub async fn list_groups(&self, page: PageRequest) -> Result<DataEnvelope<Vec<Group>>> {
		self.gateway.call_json(page.apply(ApiRequest::get("/groups"))).await
	}

	/// `GET /groups/{id}`.
	pub async fn group(&self, group_id: &str) -> Result<Group> {
		self.gateway.call_json(ApiRequest::get(format!("/groups/{}", segment(group_id)))).await
	}

	/// `GET /groups/{id}/user-mappings`.
	pub async fn group_members(
		&self,
		group_id: &str,
		page: PageRequest,
	) -> Result<DataEnvelope<Vec<GroupMember>>> {
		let path = format!("/groups/{}/user-mappings", segment(group_id));

		self.gateway.call_json(page.apply(ApiRequest::get(path))).await
	}

	/// `GET /projects`.
	pub async fn list_projects(&self, page: PageRequest) -> Result<DataEnvelope<Vec<Project>>> {
		self.gateway.call_json(page.apply(ApiRequest::get("/projects"))).await
	}

	/// `DELETE /projects/{id}`.
	pub async fn delete_project(&self, project_id: &str) -> Result<()> {
		self.gateway
			.call(ApiRequest::delete(format!("/projects/{}", segment(project_id))))
			.await
			.map(|_| ())
	}

	/// `GET /safety-filters`, most recently updated first.
	pub async fn list_safety_filters(&self, page: PageRequest) -> Result<Vec<SafetyFilter>> {
		let request = page.apply(ApiRequest::get("/safety-filters")).with_query("sort", "updated_at,desc");
		let envelope: DataEnvelope<Vec<SafetyFilter>> = self.gateway.call_json(request).await?;

		Ok(envelope.data)
	}

	/// `GET /safety-filters/{id}`.
	pub async fn safety_filter(&self, filter_id: &str) -> Result<SafetyFilter> {
		self.gateway
			.call_json(ApiRequest::get(format!("/safety-filters/{}", segment(filter_id))))
			.await
	}

	/// `DELETE /safety-filters/{id}`.
	pub async fn delete_safety_filter(&self, filter_id: &str) -> Result<()> {
		self.gateway
			.call(ApiRequest::delete(format!("/safety-filters/{}", segment(filter_id))))
			.await
			.map(|_| ())
	}
}
impl<T> Clone for ConsoleClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn clone(&self) -> Self {
		Self { gateway: self.gateway.clone() }
	}
}
impl<T> Debug for ConsoleClient<T>
where
	T: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ConsoleClient").field("gateway", &self.gateway).finish()
	}
}

/// Percent-encodes one path segment.
fn segment(raw: &str) -> String {
	form_urlencoded::byte_serialize(raw.as_bytes()).collect::<String>().replace('+', "%20")
}
