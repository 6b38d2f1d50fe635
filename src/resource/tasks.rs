//! Task executions

use super::base::{defaults_table, encode_json_argument, Payload, Resource, ResourceManager};
use super::executions::{sub_execution_query, Execution};
use super::query::{append_query, ListParams};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::OnceLock;

const URL: &str = "/tasks";
const RESPONSE_KEY: &str = "tasks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_execution_id: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub state_info: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub published: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Task {
    const RESOURCE_NAME: &'static str = "Task";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[
                ("state_info", Value::Null),
                ("result", Value::Null),
                ("published", Value::Null),
            ])
        })
    }
}

crate::impl_resource_display!(Task);

#[derive(Debug, Serialize)]
struct RerunBody<'a> {
    id: &'a str,
    state: &'static str,
    reset: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    env: Option<String>,
}

#[derive(Clone)]
pub struct TaskManager {
    base: ResourceManager<Task>,
}

impl TaskManager {
    pub fn new(base: ResourceManager<Task>) -> Self {
        Self { base }
    }

    /// List tasks, scoped to one workflow execution when given.
    pub async fn list(
        &self,
        workflow_execution_id: Option<&str>,
        params: &ListParams,
    ) -> Result<Vec<Task>> {
        let path = match workflow_execution_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("/executions/{}/tasks", id),
            None => URL.to_string(),
        };
        let url = format!("{}{}", path, params.query_string(&[]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.base.ensure_not_empty(&[("id", id)])?;
        self.base.get(&format!("{}/{}", URL, id)).await
    }

    /// Run a failed task again, optionally resetting its action executions.
    pub async fn rerun(&self, id: &str, reset: bool, env: Option<&Value>) -> Result<Task> {
        self.base.ensure_not_empty(&[("id", id)])?;

        let body = RerunBody {
            id,
            state: "RUNNING",
            reset,
            env: env.map(|e| encode_json_argument("env", e)).transpose()?,
        };
        self.base
            .update(&format!("{}/{}", URL, id), Payload::json(&body)?)
            .await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<Task>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }

    /// Workflow executions started by the task; a negative `max_depth` means unlimited.
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
        ResourceManager::<Execution>::new(self.base.transport().clone())
            .list(&url, "executions")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn manager(mock: &Arc<MockTransport>) -> TaskManager {
        TaskManager::new(ResourceManager::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_list_scoped_to_execution() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"tasks": [{"id": "t1", "name": "hello", "type": "ACTION"}]}"#);
        mock.respond(200, r#"{"tasks": []}"#);

        let tasks = manager(&mock).list(Some("e1"), &ListParams::new()).await.unwrap();
        assert_eq!(tasks[0].task_type.as_deref(), Some("ACTION"));
        assert_eq!(mock.last_call().unwrap().path, "/executions/e1/tasks");

        manager(&mock)
            .list(None, &ListParams::new().filter("state", "ERROR"))
            .await
            .unwrap();
        assert_eq!(mock.last_call().unwrap().path, "/tasks?state=ERROR");
    }

    #[tokio::test]
    async fn test_defaults_present_in_dict() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id": "t1", "state": "SUCCESS"}"#);

        let task = manager(&mock).get("t1").await.unwrap();
        let dict = task.to_dict();
        assert_eq!(dict.get("result"), Some(&Value::Null));
        assert_eq!(dict.get("published"), Some(&Value::Null));
        assert_eq!(dict.get("state_info"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_rerun() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id": "t1", "state": "RUNNING"}"#);

        let task = manager(&mock)
            .rerun("t1", true, Some(&json!({"k": "v"})))
            .await
            .unwrap();
        assert_eq!(task.state.as_deref(), Some("RUNNING"));

        let call = mock.last_call().unwrap();
        assert_eq!(call.method, "PUT");
        assert_eq!(call.path, "/tasks/t1");
        let body: Value = serde_json::from_str(call.body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({"id": "t1", "state": "RUNNING", "reset": true, "env": "{\"k\":\"v\"}"})
        );
    }

    #[tokio::test]
    async fn test_sub_executions() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"executions": [{"id": "e2", "task_execution_id": "t1"}]}"#);

        let subs = manager(&mock).get_sub_executions("t1", false, -1).await.unwrap();
        assert_eq!(subs[0].task_execution_id.as_deref(), Some("t1"));
        assert_eq!(subs[0].description.as_deref(), Some(""));
        assert_eq!(mock.last_call().unwrap().path, "/tasks/t1/executions");
    }

    #[test]
    fn test_null_values_tolerated() {
        let task = Task::from_json(serde_json::json!({
            "id": "t1",
            "result": null,
            "workflow_namespace": null
        }))
        .unwrap();

        let dict = task.to_dict();
        let mut keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["id", "published", "result", "state_info", "workflow_namespace"]);
        assert_eq!(dict.get("workflow_namespace"), Some(&serde_json::Value::Null));
    }
}
