//! Action executions

use super::base::{defaults_table, encode_json_argument, Payload, Resource, ResourceManager};
use super::query::ListParams;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

const URL: &str = "/action_executions";
const RESPONSE_KEY: &str = "action_executions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub state_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for ActionExecution {
    const RESOURCE_NAME: &'static str = "ActionExecution";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[("state_info", Value::Null), ("output", Value::Null)])
        })
    }
}

crate::impl_resource_display!(ActionExecution);

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<String>,
    #[serde(skip_serializing_if = "str::is_empty")]
    workflow_namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
}

#[derive(Clone)]
pub struct ActionExecutionManager {
    base: ResourceManager<ActionExecution>,
}

impl ActionExecutionManager {
    pub fn new(base: ResourceManager<ActionExecution>) -> Self {
        Self { base }
    }

    /// Run a single action outside of any workflow.
    ///
    /// `params` may set `run_sync` or `save_result`.
    pub async fn create(
        &self,
        name: &str,
        input: Option<&Value>,
        namespace: &str,
        params: &Map<String, Value>,
    ) -> Result<ActionExecution> {
        self.base.ensure_not_empty(&[("name", name)])?;

        let body = CreateBody {
            name,
            input: input.map(|v| encode_json_argument("input", v)).transpose()?,
            params: if params.is_empty() {
                None
            } else {
                Some(serde_json::to_string(params)?)
            },
            workflow_namespace: namespace,
        };
        self.base.create(URL, Payload::json(&body)?).await
    }

    /// Complete or fail an action execution from outside.
    pub async fn update(
        &self,
        id: &str,
        state: Option<&str>,
        output: Option<&Value>,
    ) -> Result<ActionExecution> {
        self.base.ensure_not_empty(&[("id", id)])?;
        if state.is_none() && output.is_none() {
            return Err(Error::IllegalArgument(
                "either state or output must be given".to_string(),
            ));
        }

        let body = UpdateBody {
            state: state.map(String::from),
            output: output.map(|v| encode_json_argument("output", v)).transpose()?,
        };
        self.base
            .update(&format!("{}/{}", URL, id), Payload::json(&body)?)
            .await
    }

    /// List action executions, scoped to one task execution when given.
    pub async fn list(
        &self,
        task_execution_id: Option<&str>,
        params: &ListParams,
    ) -> Result<Vec<ActionExecution>> {
        let path = match task_execution_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("/tasks/{}/action_executions", id),
            None => URL.to_string(),
        };
        let url = format!("{}{}", path, params.query_string(&[]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, id: &str) -> Result<ActionExecution> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.get(&format!("{}/{}", URL, id)).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.delete(&format!("{}/{}", URL, id)).await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<ActionExecution>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }
}
