//! Workflow executions

use super::base::{
    defaults_table, encode_json_argument, is_uuid_like, Payload, Resource, ResourceManager,
};
use super::query::{append_query, ListParams};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/executions";
const RESPONSE_KEY: &str = "executions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default)]
    pub workflow_namespace: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub state_info: Option<String>,
    /// JSON-encoded workflow input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// JSON-encoded workflow output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// JSON-encoded start parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_execution_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Execution {
    const RESOURCE_NAME: &'static str = "Execution";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[
                ("description", json!("")),
                ("state_info", Value::Null),
                ("workflow_namespace", json!("")),
            ])
        })
    }
}

crate::impl_resource_display!(Execution);

/// Arguments for starting an execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionCreate {
    /// Workflow name or UUID
    pub workflow_identifier: String,
    pub namespace: String,
    /// Workflow input; a string must already be JSON
    pub input: Option<Value>,
    pub description: String,
    /// Re-run the workflow of an earlier execution
    pub source_execution_id: Option<String>,
    /// Start parameters such as `env` or `task_name`
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct CreateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow_namespace: Option<String>,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_execution_id: Option<String>,
}

/// Arguments for changing a running execution
#[derive(Debug, Clone, Default)]
pub struct ExecutionUpdate {
    pub state: Option<String>,
    pub description: Option<String>,
    pub env: Option<Value>,
}

#[derive(Debug, Serialize)]
struct UpdateBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Clone)]
pub struct ExecutionManager {
    base: ResourceManager<Execution>,
}

/// Query pairs shared by the sub-execution endpoints
pub(crate) fn sub_execution_query(
    errors_only: bool,
    max_depth: i64,
) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if errors_only {
        pairs.push(("errors_only", "true".to_string()));
    }
    if max_depth >= 0 {
        pairs.push(("max_depth", max_depth.to_string()));
    }
    pairs
}

impl ExecutionManager {
    pub fn new(base: ResourceManager<Execution>) -> Self {
        Self { base }
    }

    pub async fn create(&self, request: ExecutionCreate) -> Result<Execution> {
        if request.source_execution_id.is_none() {
            self.base.ensure_not_empty(&[(
                "workflow_identifier",
                request.workflow_identifier.as_str(),
            )])?;
        }

        let (workflow_id, workflow_name) = if request.workflow_identifier.is_empty() {
            (None, None)
        } else if is_uuid_like(&request.workflow_identifier) {
            (Some(request.workflow_identifier.clone()), None)
        } else {
            (None, Some(request.workflow_identifier.clone()))
        };

        let input = request
            .input
            .as_ref()
            .map(|v| encode_json_argument("input", v))
            .transpose()?;
        let params = if request.params.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&request.params)?)
        };

        let body = CreateBody {
            workflow_id,
            workflow_name,
            workflow_namespace: Some(request.namespace).filter(|ns| !ns.is_empty()),
            description: request.description,
            input,
            params,
            source_execution_id: request.source_execution_id,
        };

        self.base.create(URL, Payload::json(&body)?).await
    }

    pub async fn update(&self, id: &str, update: ExecutionUpdate) -> Result<Execution> {
        self.base.ensure_not_empty(&[("id", id)])?;
        if update.state.is_none() && update.description.is_none() && update.env.is_none() {
            return Err(Error::IllegalArgument(
                "one of state, description or env must be given".to_string(),
            ));
        }

        let body = UpdateBody {
            state: update.state,
            description: update.description,
            params: update.env.map(|env| json!({ "env": env })),
        };
        self.base
            .update(&format!("{}/{}", URL, id), Payload::json(&body)?)
            .await
    }

    /// List executions, optionally only those started by `task`.
    ///
    /// `root_execution_id` and `nulls` are ordinary filters on `params`.
    pub async fn list(&self, task: Option<&str>, params: &ListParams) -> Result<Vec<Execution>> {
        let url = format!(
            "{}{}",
            URL,
            params.query_string(&[("task_execution_id", task.unwrap_or_default())])
        );
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, id: &str) -> Result<Execution> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.get(&format!("{}/{}", URL, id)).await
    }

    /// Delete an execution; `force` also removes running ones.
    pub async fn delete(&self, id: &str, force: bool) -> Result<()> {
        self.base.ensure_not_empty(&[("id", id)])?;
        let url = format!("{}/{}", URL, id);
        let url = if force {
            append_query(&url, &[("force", "true")])
        } else {
            url
        };
        self.base.delete(&url).await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<Execution>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }

    /// Executions spawned under `id`; a negative `max_depth` means unlimited.
    pub async fn get_sub_executions(
        &self,
        id: &str,
        errors_only: bool,
        max_depth: i64,
    ) -> Result<Vec<Execution>> {
        self.base.ensure_not_empty(&[("id", id)])?;
        let url = append_query(
            &format!("{}/{}/executions", URL, id),
            &sub_execution_query(errors_only, max_depth),
        );
        self.base.list(&url, RESPONSE_KEY).await
    }

    /// Execution tree report, returned as raw JSON
    pub async fn get_report(
        &self,
        id: &str,
        errors_only: bool,
        max_depth: Option<i64>,
        statistics_only: bool,
    ) -> Result<Value> {
        self.base.ensure_not_empty(&[("id", id)])?;

        let mut pairs = vec![
            ("errors_only", errors_only.to_string()),
            ("statistics_only", statistics_only.to_string()),
        ];
        if let Some(depth) = max_depth {
            pairs.push(("max_depth", depth.to_string()));
        }
        let url = append_query(&format!("{}/{}/report", URL, id), &pairs);
        self.base.get_json(&url).await
    }
}
