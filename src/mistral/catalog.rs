//! Service catalog
//!
//! Keystone v3 returns the catalog alongside the issued token. The client
//! uses it to find the Mistral endpoint when no explicit URL is configured.

use serde::{Deserialize, Serialize};

/// Default service type registered for Mistral
pub const DEFAULT_SERVICE_TYPE: &str = "workflowv2";

/// Default endpoint interface
pub const DEFAULT_INTERFACE: &str = "public";

/// One endpoint of a catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub interface: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Endpoint {
    fn in_region(&self, region: &str) -> bool {
        self.region.as_deref() == Some(region) || self.region_id.as_deref() == Some(region)
    }
}

/// One service in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// The full service catalog of an authenticated session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCatalog {
    pub entries: Vec<CatalogEntry>,
}

/// Map v2-style endpoint types (`publicURL`) onto v3 interfaces (`public`).
pub fn normalize_interface(endpoint_type: &str) -> &str {
    endpoint_type.strip_suffix("URL").unwrap_or(endpoint_type)
}

impl ServiceCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve the URL of `service_type` for `interface` in `region`.
    ///
    /// Without a region the first matching endpoint wins.
    pub fn resolve_endpoint(
        &self,
        service_type: &str,
        interface: &str,
        region: Option<&str>,
    ) -> Option<String> {
        let interface = normalize_interface(interface);

        self.entries
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .filter(|endpoint| endpoint.interface == interface)
            .find(|endpoint| region.map_or(true, |r| endpoint.in_region(r)))
            .map(|endpoint| endpoint.url.clone())
    }

    /// Serialized form forwarded to the service for delegated calls
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> ServiceCatalog {
        serde_json::from_value(json!([
            {
                "type": "identity",
                "endpoints": [
                    {"interface": "public", "region": "RegionOne", "url": "http://keystone:5000/v3"}
                ]
            },
            {
                "type": "workflowv2",
                "name": "mistral",
                "endpoints": [
                    {
                        "interface": "public",
                        "region": "RegionOne",
                        "url": "http://mistral-one:8989/v2"
                    },
                    {
                        "interface": "internal",
                        "region": "RegionOne",
                        "url": "http://10.0.0.1:8989/v2"
                    },
                    {
                        "interface": "public",
                        "region_id": "RegionTwo",
                        "url": "http://mistral-two:8989/v2"
                    }
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn test_resolve_by_region() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve_endpoint("workflowv2", "public", Some("RegionTwo")),
            Some("http://mistral-two:8989/v2".to_string())
        );
        assert_eq!(
            catalog.resolve_endpoint("workflowv2", "internal", Some("RegionOne")),
            Some("http://10.0.0.1:8989/v2".to_string())
        );
    }

    #[test]
    fn test_resolve_accepts_v2_endpoint_types() {
        let catalog = catalog();
        assert_eq!(
            catalog.resolve_endpoint("workflowv2", "publicURL", None),
            Some("http://mistral-one:8989/v2".to_string())
        );
    }

    #[test]
    fn test_resolve_missing_is_none() {
        let catalog = catalog();
        assert_eq!(catalog.resolve_endpoint("workflowv2", "admin", None), None);
        assert_eq!(catalog.resolve_endpoint("compute", "public", None), None);
        assert_eq!(
            catalog.resolve_endpoint("workflowv2", "public", Some("RegionThree")),
            None
        );
    }

    #[test]
    fn test_catalog_round_trips_as_keystone_list() {
        let catalog = catalog();
        let encoded = catalog.to_json().unwrap();
        assert!(encoded.starts_with('['));
        let decoded: ServiceCatalog = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, catalog);
    }
}
