//! Code sources
//!
//! Uploaded source files that dynamic actions load classes from. Content
//! travels as plain text; identity and scope go in the query string.

use super::base::{defaults_table, Payload, Resource, ResourceManager};
use super::query::{build_query, with_namespace, ListParams};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::OnceLock;

const URL: &str = "/code_sources";
const RESPONSE_KEY: &str = "code_sources";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for CodeSource {
    const RESOURCE_NAME: &'static str = "CodeSource";

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

crate::impl_resource_display!(CodeSource);

#[derive(Clone)]
pub struct CodeSourceManager {
    base: ResourceManager<CodeSource>,
}

impl CodeSourceManager {
    pub fn new(base: ResourceManager<CodeSource>) -> Self {
        Self { base }
    }

    pub async fn create(
        &self,
        name: &str,
        content: &str,
        namespace: &str,
        scope: &str,
    ) -> Result<CodeSource> {
        self.base
            .ensure_not_empty(&[("name", name), ("content", content)])?;
        let url = format!(
            "{}{}",
            URL,
            build_query(&[("name", name), ("scope", scope), ("namespace", namespace)])
        );
        self.base.create(&url, Payload::text(content)).await
    }

    pub async fn update(
        &self,
        identifier: &str,
        content: &str,
        namespace: &str,
        scope: &str,
    ) -> Result<CodeSource> {
        self.base
            .ensure_not_empty(&[("identifier", identifier), ("content", content)])?;
        let url = format!(
            "{}{}",
            URL,
            build_query(&[
                ("identifier", identifier),
                ("scope", scope),
                ("namespace", namespace)
            ])
        );
        self.base.update(&url, Payload::text(content)).await
    }

    pub async fn list(&self, namespace: &str, params: &ListParams) -> Result<Vec<CodeSource>> {
        let url = format!("{}{}", URL, params.query_string(&[("namespace", namespace)]));
        self.base.list(&url, RESPONSE_KEY).await
    }

    pub async fn get(&self, identifier: &str, namespace: &str) -> Result<CodeSource> {
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
