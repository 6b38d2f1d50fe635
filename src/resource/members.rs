//! Resource sharing between projects
//!
//! Members live under the shared resource, e.g.
//! `/workflows/{id}/members/{project}`.

use super::base::{Payload, Resource, ResourceManager};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const RESPONSE_KEY: &str = "members";

/// Status a member sets to accept a share
pub const STATUS_ACCEPTED: &str = "accepted";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Member {
    const RESOURCE_NAME: &'static str = "Member";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

crate::impl_resource_display!(Member);

#[derive(Clone)]
pub struct MemberManager {
    base: ResourceManager<Member>,
}

impl MemberManager {
    pub fn new(base: ResourceManager<Member>) -> Self {
        Self { base }
    }

    fn members_url(resource_id: &str, resource_type: &str) -> String {
        format!("/{}s/{}/members", resource_type, resource_id)
    }

    /// Member id to use when the caller gave none: the session's own project.
    fn own_member_id(&self, member_id: Option<&str>) -> Result<String> {
        match member_id.filter(|m| !m.is_empty()) {
            Some(id) => Ok(id.to_string()),
            None => self
                .base
                .transport()
                .project_id()
                .map(String::from)
                .ok_or_else(|| {
                    Error::Configuration("member id not given and no project in session".into())
                }),
        }
    }

    /// Share a resource with another project
    pub async fn create(
        &self,
        resource_id: &str,
        resource_type: &str,
        member_id: &str,
    ) -> Result<Member> {
        self.base.ensure_not_empty(&[
            ("resource_id", resource_id),
            ("resource_type", resource_type),
            ("member_id", member_id),
        ])?;

        self.base
            .create(
                &Self::members_url(resource_id, resource_type),
                Payload::Json(json!({ "member_id": member_id })),
            )
            .await
    }

    /// Accept or reject a share; defaults to accepting as the current project.
    pub async fn update(
        &self,
        resource_id: &str,
        resource_type: &str,
        member_id: Option<&str>,
        status: Option<&str>,
    ) -> Result<Member> {
        self.base.ensure_not_empty(&[
            ("resource_id", resource_id),
            ("resource_type", resource_type),
        ])?;
        let member_id = self.own_member_id(member_id)?;
        let status = status.unwrap_or(STATUS_ACCEPTED);

        let url = format!("{}/{}", Self::members_url(resource_id, resource_type), member_id);
        self.base
            .update(&url, Payload::Json(json!({ "status": status })))
            .await
    }

    pub async fn list(&self, resource_id: &str, resource_type: &str) -> Result<Vec<Member>> {
        self.base.ensure_not_empty(&[
            ("resource_id", resource_id),
            ("resource_type", resource_type),
        ])?;
        self.base
            .list(&Self::members_url(resource_id, resource_type), RESPONSE_KEY)
            .await
    }

    pub async fn get(
        &self,
        resource_id: &str,
        resource_type: &str,
        member_id: Option<&str>,
    ) -> Result<Member> {
        self.base.ensure_not_empty(&[
            ("resource_id", resource_id),
            ("resource_type", resource_type),
        ])?;
        let member_id = self.own_member_id(member_id)?;
        self.base
            .get(&format!("{}/{}", Self::members_url(resource_id, resource_type), member_id))
            .await
    }

    pub async fn delete(
        &self,
        resource_id: &str,
        resource_type: &str,
        member_id: &str,
    ) -> Result<()> {
        self.base.ensure_not_empty(&[
            ("resource_id", resource_id),
            ("resource_type", resource_type),
            ("member_id", member_id),
        ])?;
        self.base
            .delete(&format!("{}/{}", Self::members_url(resource_id, resource_type), member_id))
            .await
    }
}
