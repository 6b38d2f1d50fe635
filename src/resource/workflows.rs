//! Workflows
//!
//! Definitions are uploaded as raw YAML text. One upload may define several
//! workflows, so create and update return a list.

use super::base::{defaults_table, Payload, Resource, ResourceManager};
use super::query::{build_query, with_namespace, ListParams};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/workflows";
const RESPONSE_KEY: &str = "workflows";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Workflow {
    const RESOURCE_NAME: &'static str = "Workflow";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }

    fn defaults() -> &'static Map<String, Value> {
        static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
        DEFAULTS.get_or_init(|| {
            defaults_table(&[
                ("namespace", json!("")),
                ("scope", json!("private")),
                ("tags", json!([])),
            ])
        })
    }
}

crate::impl_resource_display!(Workflow);

/// Outcome of a server-side definition check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct WorkflowManager {
    base: ResourceManager<Workflow>,
}

impl WorkflowManager {
    pub fn new(base: ResourceManager<Workflow>) -> Self {
        Self { base }
    }

    /// Upload a definition; returns every workflow it declares.
    pub async fn create(
        &self,
        definition: &str,
        namespace: &str,
        scope: &str,
    ) -> Result<Vec<Workflow>> {
        self.base.ensure_not_empty(&[("definition", definition)])?;

        let url = format!("{}{}", URL, build_query(&[("scope", scope), ("namespace", namespace)]));
        self.base
            .create_many(&url, Payload::text(definition), RESPONSE_KEY)
            .await
    }

    /// Replace a definition, either by content or for one workflow by id.
    pub async fn update(
        &self,
        definition: &str,
        namespace: &str,
        scope: &str,
        id: Option<&str>,
    ) -> Result<Vec<Workflow>> {
        self.base.ensure_not_empty(&[("definition", definition)])?;

        let path = match id {
            Some(id) => format!("{}/{}", URL, id),
            None => URL.to_string(),
        };
        let url = format!("{}{}", path, build_query(&[("namespace", namespace), ("scope", scope)]));
        self.base
            .update_many(&url, Payload::text(definition), RESPONSE_KEY)
            .await
    }

    pub async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<Workflow>> {
        let url = format!("{}{}", URL, params.query_string(&[("namespace", namespace)]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, identifier: &str, namespace: &str) -> Result<Workflow> {
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

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<Workflow>> {
        self.base.find(URL, RESPONSE_KEY, filters).await
    }

    pub async fn validate(&self, definition: &str) -> Result<ValidationResult> {
        self.base.ensure_not_empty(&[("definition", definition)])?;
        let body = self
            .base
            .post_json(&format!("{}/validate", URL), Payload::text(definition), 200)
            .await?;
        Ok(serde_json::from_value(body)?)
    }
}
