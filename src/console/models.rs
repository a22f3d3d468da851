//! Response shapes of the upstream admin API.
//!
//! Only the fields the console reads are modeled; unknown fields are ignored and nullable
//! columns are `Option`s.

// self
use crate::{_prelude::*, gateway::ApiRequest};

/// Standard list envelope: `{ "data": ..., "payload": { "pagination": ... } }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DataEnvelope<T> {
	/// Response items.
	pub data: T,
	/// Paging metadata, present on paginated endpoints.
	#[serde(default)]
	pub payload: Option<PagePayload>,
}
impl<T> DataEnvelope<T> {
	/// Returns the pagination block, if the endpoint sent one.
	pub fn pagination(&self) -> Option<&Pagination> {
		self.payload.as_ref().and_then(|payload| payload.pagination.as_ref())
	}
}

/// Wrapper around [`Pagination`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PagePayload {
	/// Paging metadata.
	#[serde(default)]
	pub pagination: Option<Pagination>,
}

/// Paging metadata of a list response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Pagination {
	/// One-based page number.
	pub page: u32,
	/// Total number of items.
	pub total: u64,
	/// Last available page.
	pub last_page: u32,
}

/// Page selection sent as `page` and `size` query parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
	/// One-based page number.
	pub page: u32,
	/// Items per page.
	pub size: u32,
}
impl PageRequest {
	/// Selects `page` with `size` items.
	pub fn new(page: u32, size: u32) -> Self {
		Self { page: page.max(1), size: size.max(1) }
	}

	pub(crate) fn apply(self, request: ApiRequest) -> ApiRequest {
		request.with_query("page", self.page).with_query("size", self.size)
	}
}
impl Default for PageRequest {
	fn default() -> Self {
		Self::new(1, 12)
	}
}

/// Console operator or end user.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
	/// Opaque user identifier.
	pub id: String,
	/// Login name.
	pub username: String,
	/// Contact address, when one is on file.
	#[serde(default)]
	pub email: Option<String>,
	/// Given name.
	#[serde(default)]
	pub first_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub last_name: Option<String>,
}

/// User group.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Group {
	/// Opaque group identifier.
	pub id: String,
	/// Display name.
	pub name: String,
	/// Free-form description.
	#[serde(default)]
	pub description: Option<String>,
	/// Number of members; `None` when the listing does not count them.
	#[serde(default)]
	pub member_count: Option<u64>,
	/// Creation timestamp as sent by the console.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Last modification timestamp as sent by the console.
	#[serde(default)]
	pub updated_at: Option<String>,
}

/// User mapped into a group.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GroupMember {
	/// User identifier.
	pub id: String,
	/// Login name.
	pub username: String,
	/// Contact address.
	#[serde(default)]
	pub email: Option<String>,
	/// When the user was added to the group.
	#[serde(default)]
	pub joined_at: Option<String>,
}

/// Project identity as embedded in other resources.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ProjectRef {
	/// Project identifier, also used in API paths.
	pub id: String,
	/// Display name.
	pub name: String,
}

/// Project-scoped role.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Role {
	/// Role identifier.
	pub id: String,
	/// Role name, e.g. `viewer`.
	pub name: String,
	/// Free-form description.
	#[serde(default)]
	pub description: Option<String>,
}

/// A role granted (or grantable) to a user within one project.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RoleAssignment {
	/// Project owning the role.
	pub project: ProjectRef,
	/// The role itself.
	pub role: Role,
}

/// Kubernetes-style namespace backing a project.
///
/// Quotas are kept as the console renders them (`"4"`, `"16Gi"`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Namespace {
	/// Namespace name.
	pub id: String,
	/// Provisioning status.
	#[serde(default)]
	pub status: Option<String>,
	/// CPU quota.
	#[serde(default)]
	pub cpu_quota: Option<String>,
	/// Memory quota.
	#[serde(default)]
	pub mem_quota: Option<String>,
	/// GPU quota.
	#[serde(default)]
	pub gpu_quota: Option<String>,
	/// Username of the creator.
	#[serde(default)]
	pub creator: Option<String>,
	/// Creation timestamp.
	#[serde(default)]
	pub created_at: Option<String>,
	/// Last modification timestamp.
	#[serde(default)]
	pub modified_at: Option<String>,
}

/// Project list row.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Project {
	/// Project identity.
	pub project: ProjectRef,
	/// Backing namespace, absent while it is being provisioned.
	#[serde(default)]
	pub namespace: Option<Namespace>,
}

/// Stop-word rule applied to model traffic of a project.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SafetyFilter {
	/// Filter identifier.
	pub id: String,
	/// Word or phrase the filter matches.
	pub stopword: String,
	/// Optional display label.
	#[serde(default)]
	pub label: Option<String>,
	/// Category the rule is grouped under.
	#[serde(default)]
	pub category: Option<String>,
	/// Activation status.
	#[serde(default)]
	pub status: Option<String>,
	/// Last modification timestamp.
	#[serde(default)]
	pub updated_at: Option<String>,
	/// Owning project; `None` for console-wide rules.
	#[serde(default)]
	pub project_id: Option<String>,
}
