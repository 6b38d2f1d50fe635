//! Event triggers
//!
//! Start a workflow when a notification arrives on a message bus topic.

use super::base::{defaults_table, encode_json_argument, Payload, Resource, ResourceManager};
use super::query::ListParams;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/event_triggers";
const RESPONSE_KEY: &str = "event_triggers";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for EventTrigger {
    const RESOURCE_NAME: &'static str = "EventTrigger";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| defaults_table(&[("scope", json!("private"))]))
    }
}

crate::impl_resource_display!(EventTrigger);

#[derive(Debug, Clone, Default)]
pub struct EventTriggerCreate {
    pub name: String,
    pub workflow_id: String,
    pub exchange: String,
    pub topic: String,
    pub event: String,
    pub workflow_input: Option<Value>,
    pub workflow_params: Option<Value>,
    /// `private` or `public`; the server default applies when empty
    pub scope: String,
}

#[derive(Debug, Serialize)]
struct CreateBody {
    name: String,
    workflow_id: String,
    exchange: String,
    topic: String,
    event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_params: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    scope: String,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

#[derive(Clone)]
pub struct EventTriggerManager {
    base: ResourceManager<EventTrigger>,
}

impl EventTriggerManager {
    pub fn new(base: ResourceManager<EventTrigger>) -> Self {
        Self { base }
    }

    pub async fn create(&self, request: EventTriggerCreate) -> Result<EventTrigger> {
        self.base.ensure_not_empty(&[
            ("name", request.name.as_str()),
            ("workflow_id", request.workflow_id.as_str()),
            ("exchange", request.exchange.as_str()),
            ("topic", request.topic.as_str()),
            ("event", request.event.as_str()),
        ])?;

        let workflow_input = request
            .workflow_input
            .as_ref()
            .map(|v| encode_json_argument("workflow_input", v))
            .transpose()?;
        let workflow_params = request
            .workflow_params
            .as_ref()
            .map(|v| encode_json_argument("workflow_params", v))
            .transpose()?;

        let body = CreateBody {
            name: request.name,
            workflow_id: request.workflow_id,
            exchange: request.exchange,
            topic: request.topic,
            event: request.event,
            workflow_input,
            workflow_params,
            scope: request.scope,
        };
        self.base.create(URL, Payload::json(&body)?).await
    }

    /// Rename a trigger or change its scope
    pub async fn update(
        &self,
        id: &str,
        name: Option<&str>,
        scope: Option<&str>,
    ) -> Result<EventTrigger> {
        self.base.ensure_not_empty(&[("id", id)])?;
        if name.is_none() && scope.is_none() {
            return Err(Error::IllegalArgument(
                "either name or scope must be given".to_string(),
            ));
        }

        self.base
            .update(
                &format!("{}/{}", URL, id),
                Payload::json(&UpdateBody { name, scope })?,
            )
            .await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<EventTrigger>> {
        let url = format!("{}{}", URL, params.query_string(&[]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, id: &str) -> Result<EventTrigger> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.get(&format!("{}/{}", URL, id)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.delete(&format!("{}/{}", URL, id)).await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<EventTrigger>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }
}
