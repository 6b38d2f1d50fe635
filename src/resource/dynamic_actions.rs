//! Dynamic actions
//!
//! Actions backed by a class in an uploaded code source.

use super::base::{defaults_table, Payload, Resource, ResourceManager};
use super::query::{with_namespace, ListParams};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/dynamic_actions";
const RESPONSE_KEY: &str = "dynamic_actions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicAction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_source_name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
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

impl Resource for DynamicAction {
    const RESOURCE_NAME: &'static str = "DynamicAction";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[("namespace", json!("")), ("scope", json!("private"))])
        })
    }
}

crate::impl_resource_display!(DynamicAction);

#[derive(Debug, Serialize)]
struct CreateBody<'a> {
    name: &'a str,
    class_name: &'a str,
    code_source: &'a str,
    scope: &'a str,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateBody<'a> {
    identifier: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    class_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code_source: Option<&'a str>,
    scope: &'a str,
    namespace: &'a str,
}

#[derive(Clone)]
pub struct DynamicActionManager {
    base: ResourceManager<DynamicAction>,
}

impl DynamicActionManager {
    pub fn new(base: ResourceManager<DynamicAction>) -> Self {
        Self { base }
    }

    /// Register `class_name` from `code_source` (name or id) as an action.
    pub async fn create(
        &self,
        name: &str,
        class_name: &str,
        code_source: &str,
        scope: &str,
        namespace: &str,
    ) -> Result<DynamicAction> {
        self.base.ensure_not_empty(&[
            ("name", name),
            ("class_name", class_name),
            ("code_source", code_source),
        ])?;

        let body = CreateBody {
            name,
            class_name,
            code_source,
            scope,
            namespace,
        };
        self.base.create(URL, Payload::json(&body)?).await
    }

    pub async fn update(
        &self,
        identifier: &str,
        class_name: Option<&str>,
        code_source: Option<&str>,
        scope: &str,
        namespace: &str,
    ) -> Result<DynamicAction> {
        self.base.ensure_not_empty(&[("identifier", identifier)])?;
        if class_name.is_none() && code_source.is_none() {
            return Err(Error::IllegalArgument(
                "either class_name or code_source must be given".to_string(),
            ));
        }

        let body = UpdateBody {
            identifier,
            class_name,
            code_source,
            scope,
            namespace,
        };
        self.base.update(URL, Payload::json(&body)?).await
    }

    pub async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<DynamicAction>> {
        let url = format!("{}{}", URL, params.query_string(&[("namespace", namespace)]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, identifier: &str, namespace: &str) -> Result<DynamicAction> {
        self.base.ensure_not_empty(&[("identifier", identifier)])?;
        self.base
            .get(&with_namespace(&format!("{}/{}", URL, identifier), namespace))
            .await
    }

    pub async fn delete(&self, identifier: &str, namespace: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("identifier", identifier)])?;
        self.base
            .delete(&with_namespace(&format!("{}/{}", URL, identifier), namespace))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockTransport;
    use std::sync::Arc;

    fn manager(mock: &Arc<MockTransport>) -> DynamicActionManager {
        DynamicActionManager::new(ResourceManager::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_create() {
        let mock = MockTransport::new();
        mock.respond(
            201,
            r#"{"id": "da1", "name": "hello", "class_name": "Hello", "code_source_name": "hello.py"}"#,
        );

        let action = manager(&mock)
            .create("hello", "Hello", "hello.py", "private", "")
            .await
            .unwrap();
        assert_eq!(action.class_name.as_deref(), Some("Hello"));
        assert_eq!(action.namespace.as_deref(), Some(""));

        let body: Value =
            serde_json::from_str(mock.last_call().unwrap().body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "name": "hello",
                "class_name": "Hello",
                "code_source": "hello.py",
                "scope": "private",
                "namespace": ""
            })
        );
    }

    #[tokio::test]
    async fn test_update_puts_to_collection() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id": "da1", "class_name": "Goodbye"}"#);

        manager(&mock)
            .update("hello", Some("Goodbye"), None, "private", "")
            .await
            .unwrap();
        let call = mock.last_call().unwrap();
        assert_eq!(call.method, "PUT");
        assert_eq!(call.path, "/dynamic_actions");
        let body: Value = serde_json::from_str(call.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["identifier"], "hello");
        assert!(body.get("code_source").is_none());
    }

    #[tokio::test]
    async fn test_update_needs_a_change() {
        let mock = MockTransport::new();
        let err = manager(&mock)
            .update("hello", None, None, "private", "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::IllegalArgument(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_null_values_tolerated() {
        let action = DynamicAction::from_json(serde_json::json!({
            "name": "greet",
            "scope": null,
            "class_name": null
        }))
        .unwrap();
        assert_eq!(action.scope, None);

        let dict = action.to_dict();
        let mut keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["class_name", "name", "namespace", "scope"]);
        assert_eq!(dict.get("class_name"), Some(&serde_json::Value::Null));
    }
}
