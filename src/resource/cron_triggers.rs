//! Cron triggers

use super::base::{
    defaults_table, encode_json_argument, is_uuid_like, Payload, Resource, ResourceManager,
};
use super::query::ListParams;
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/cron_triggers";
const RESPONSE_KEY: &str = "cron_triggers";

/// Format accepted for the first execution time, in UTC
pub const FIRST_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_execution_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_execution_time: Option<String>,
    #[serde(default)]
    pub remaining_executions: Option<i64>,
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

impl Resource for CronTrigger {
    const RESOURCE_NAME: &'static str = "CronTrigger";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[
                ("remaining_executions", Value::Null),
                ("scope", json!("private")),
            ])
        })
    }
}

crate::impl_resource_display!(CronTrigger);

/// Arguments for scheduling a workflow
#[derive(Debug, Clone, Default)]
pub struct CronTriggerCreate {
    pub name: String,
    /// Workflow name or UUID
    pub workflow_identifier: String,
    pub namespace: String,
    pub workflow_input: Option<Value>,
    pub workflow_params: Option<Value>,
    /// Cron expression, e.g. `* * * * *`
    pub pattern: Option<String>,
    /// `YYYY-MM-DD HH:MM`
    pub first_time: Option<String>,
    /// Number of runs before the trigger removes itself
    pub count: Option<i64>,
}

#[derive(Debug, Serialize)]
struct CreateBody {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_execution_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_executions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_params: Option<String>,
}

/// Check a first execution time against [`FIRST_TIME_FORMAT`]
pub fn parse_first_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, FIRST_TIME_FORMAT).map_err(|e| {
        Error::IllegalArgument(format!(
            "first execution time '{}' must look like YYYY-MM-DD HH:MM: {}",
            value, e
        ))
    })
}

#[derive(Clone)]
pub struct CronTriggerManager {
    base: ResourceManager<CronTrigger>,
}

impl CronTriggerManager {
    pub fn new(base: ResourceManager<CronTrigger>) -> Self {
        Self { base }
    }

    pub async fn create(&self, request: CronTriggerCreate) -> Result<CronTrigger> {
        self.base.ensure_not_empty(&[
            ("name", request.name.as_str()),
            ("workflow_identifier", request.workflow_identifier.as_str()),
        ])?;
        if let Some(first_time) = &request.first_time {
            parse_first_time(first_time)?;
        }

        let (workflow_id, workflow_name) = if is_uuid_like(&request.workflow_identifier) {
            (Some(request.workflow_identifier), None)
        } else {
            (None, Some(request.workflow_identifier))
        };

        let body = CreateBody {
            name: request.name,
            workflow_id,
            workflow_name,
            workflow_namespace: Some(request.namespace).filter(|ns| !ns.is_empty()),
            pattern: request.pattern,
            first_execution_time: request.first_time,
            remaining_executions: request.count,
            workflow_input: request
                .workflow_input
                .as_ref()
                .map(|v| encode_json_argument("workflow_input", v))
                .transpose()?,
            workflow_params: request
                .workflow_params
                .as_ref()
                .map(|v| encode_json_argument("workflow_params", v))
                .transpose()?,
        };

        self.base.create(URL, Payload::json(&body)?).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<CronTrigger>> {
        let url = format!("{}{}", URL, params.query_string(&[]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    /// Look up by name or id
    pub async fn get(&self, identifier: &str) -> Result<CronTrigger> {
        self.base.ensure_not_empty(&[("identifier", identifier)])?;
        self.base.get(&format!("{}/{}", URL, identifier)).await
    }

    pub async fn delete(&self, identifier: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("identifier", identifier)])?;
        self.base.delete(&format!("{}/{}", URL, identifier)).await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<CronTrigger>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }
}
