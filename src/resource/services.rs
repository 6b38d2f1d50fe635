//! Mistral engine services

use super::base::{Resource, ResourceManager};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const URL: &str = "/services";
const RESPONSE_KEY: &str = "services";

/// A running engine, executor or API process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Service {
    const RESOURCE_NAME: &'static str = "Service";

    fn extra_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.extra
    }
}

crate::impl_resource_display!(Service);

#[derive(Clone)]
pub struct ServiceManager {
    base: ResourceManager<Service>,
}

impl ServiceManager {
    pub fn new(base: ResourceManager<Service>) -> Self {
        Self { base }
    }

    pub async fn list(&self) -> Result<Vec<Service>> {
        self.base.list(URL, RESPONSE_KEY).await
    }
}
