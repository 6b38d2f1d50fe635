//! Environments
//!
//! Named variable sets passed to executions. The server stores `variables`
//! as a JSON string; entities expose it decoded.

use super::base::{defaults_table, encode_json_argument, Payload, Resource, ResourceManager};
use super::query::ListParams;
use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/environments";
const RESPONSE_KEY: &str = "environments";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "decode_variables",
        skip_serializing_if = "Option::is_none"
    )]
    pub variables: Option<Value>,
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

/// Accept variables either structured or as a JSON-encoded string.
///
/// A string that does not parse is kept verbatim.
fn decode_variables<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => match serde_json::from_str(&s) {
            Ok(parsed) => Some(parsed),
            Err(_) => Some(Value::String(s)),
        },
        Some(Value::Null) | None => None,
        other => other,
    })
}

impl Resource for Environment {
    const RESOURCE_NAME: &'static str = "Environment";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[("description", json!("")), ("scope", json!("private"))])
        })
    }
}

crate::impl_resource_display!(Environment);

/// Fields accepted by create and update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Structured variables, or a string holding JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
struct Body<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

impl<'a> Body<'a> {
    fn from_spec(spec: &'a EnvironmentSpec) -> Result<Self> {
        Ok(Body {
            name: &spec.name,
            description: spec.description.as_deref(),
            variables: spec
                .variables
                .as_ref()
                .map(|v| encode_json_argument("variables", v))
                .transpose()?,
            scope: spec.scope.as_deref(),
        })
    }
}

#[derive(Clone)]
pub struct EnvironmentManager {
    base: ResourceManager<Environment>,
}

impl EnvironmentManager {
    pub fn new(base: ResourceManager<Environment>) -> Self {
        Self { base }
    }

    pub async fn create(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        self.base.ensure_not_empty(&[("name", spec.name.as_str())])?;
        let body = Body::from_spec(spec)?;
        self.base.create(URL, Payload::json(&body)?).await
    }

    pub async fn update(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        self.base.ensure_not_empty(&[("name", spec.name.as_str())])?;
        let body = Body::from_spec(spec)?;
        self.base.update(URL, Payload::json(&body)?).await
    }

    pub async fn list(&self, params: &ListParams) -> Result<Vec<Environment>> {
        let url = format!("{}{}", URL, params.query_string(&[]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, name: &str) -> Result<Environment> {
        self.base.ensure_not_empty(&[("name", name)])?;
        self.base.get(&format!("{}/{}", URL, name)).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("name", name)])?;
        self.base.delete(&format!("{}/{}", URL, name)).await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<Environment>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resource::testing::MockTransport;
    use std::sync::Arc;

    fn manager(mock: &Arc<MockTransport>) -> EnvironmentManager {
        EnvironmentManager::new(ResourceManager::new(mock.clone()))
    }

    #[test]
    fn test_variables_decoded_from_string() {
        let env = Environment::from_json(json!({
            "name": "dev",
            "variables": "{\"region\": \"eu\", \"replicas\": 2}"
        }))
        .unwrap();
        assert_eq!(env.variables, Some(json!({"region": "eu", "replicas": 2})));
        assert_eq!(env.description.as_deref(), Some(""));
        assert_eq!(env.scope.as_deref(), Some("private"));
    }

    #[test]
    fn test_variables_structured_or_missing() {
        let env = Environment::from_json(json!({"name": "dev", "variables": {"a": 1}})).unwrap();
        assert_eq!(env.variables, Some(json!({"a": 1})));

        let env = Environment::from_json(json!({"name": "dev"})).unwrap();
        assert_eq!(env.variables, None);
    }

    #[tokio::test]
    async fn test_create_encodes_variables() {
        let mock = MockTransport::new();
        mock.respond(201, r#"{"name": "dev", "variables": "{\"a\": 1}"}"#);

        let spec = EnvironmentSpec {
            name: "dev".into(),
            variables: Some(json!({"a": 1})),
            ..Default::default()
        };
        let env = manager(&mock).create(&spec).await.unwrap();
        assert_eq!(env.variables, Some(json!({"a": 1})));

        let call = mock.last_call().unwrap();
        assert_eq!(call.method, "POST");
        assert_eq!(call.path, "/environments");
        assert_eq!(
            call.body.as_deref(),
            Some(r#"{"name":"dev","variables":"{\"a\":1}"}"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_variable_string_is_rejected() {
        let mock = MockTransport::new();
        let spec = EnvironmentSpec {
            name: "dev".into(),
            variables: Some(json!("not json")),
            ..Default::default()
        };
        let err = manager(&mock).update(&spec).await.unwrap_err();
        assert!(matches!(err, Error::IllegalArgument(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_uses_collection_url() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"name": "dev", "description": "updated"}"#);

        let spec = EnvironmentSpec {
            name: "dev".into(),
            description: Some("updated".into()),
            ..Default::default()
        };
        let env = manager(&mock).update(&spec).await.unwrap();
        assert_eq!(env.description.as_deref(), Some("updated"));

        let call = mock.last_call().unwrap();
        assert_eq!(call.method, "PUT");
        assert_eq!(call.path, "/environments");
    }

    #[test]
    fn test_null_values_tolerated() {
        let env = Environment::from_json(serde_json::json!({
            "name": "e",
            "description": null,
            "variables": null
        }))
        .unwrap();
        assert_eq!(env.description, None);
        assert_eq!(env.variables, None);

        let dict = env.to_dict();
        let mut keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["description", "name", "scope", "variables"]);
        assert_eq!(dict.get("variables"), Some(&serde_json::Value::Null));
    }
}
