//! Workbooks

use super::base::{defaults_table, Payload, Resource, ResourceManager};
use super::query::{build_query, with_namespace, ListParams};
use super::workflows::ValidationResult;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/workbooks";
const RESPONSE_KEY: &str = "workbooks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workbook {
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

impl Resource for Workbook {
    const RESOURCE_NAME: &'static str = "Workbook";

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

crate::impl_resource_display!(Workbook);

#[derive(Clone)]
pub struct WorkbookManager {
    base: ResourceManager<Workbook>,
}

impl WorkbookManager {
    pub fn new(base: ResourceManager<Workbook>) -> Self {
        Self { base }
    }

    pub async fn create(&self, definition: &str, namespace: &str, scope: &str) -> Result<Workbook> {
        self.base.ensure_not_empty(&[("definition", definition)])?;
        let url = format!("{}{}", URL, build_query(&[("namespace", namespace), ("scope", scope)]));
        self.base.create(&url, Payload::text(definition)).await
    }

    pub async fn update(&self, definition: &str, namespace: &str, scope: &str) -> Result<Workbook> {
        self.base.ensure_not_empty(&[("definition", definition)])?;
        let url = format!("{}{}", URL, build_query(&[("namespace", namespace), ("scope", scope)]));
        self.base.update(&url, Payload::text(definition)).await
    }

    pub async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<Workbook>> {
        let url = format!("{}{}", URL, params.query_string(&[("namespace", namespace)]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, name: &str, namespace: &str) -> Result<Workbook> {
        self.base.ensure_not_empty(&[("name", name)])?;
        self.base
            .get(&with_namespace(&format!("{}/{}", URL, name), namespace))
            .await
    }

    pub async fn delete(&self, name: &str, namespace: &str) -> Result<()> {
        self.base.ensure_not_empty(&[("name", name)])?;
        self.base
            .delete(&with_namespace(&format!("{}/{}", URL, name), namespace))
            .await
    }

    pub async fn find(&self, filters: &[(&str, Value)]) -> Result<Vec<Workbook>> {
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
