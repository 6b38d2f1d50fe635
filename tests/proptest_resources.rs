//! Property-based tests using proptest
//!
//! These tests cover query string construction, client-side filtering and
//! default filling with randomized inputs.

use async_trait::async_trait;
use mistralclient::mistral::http::Response;
use mistralclient::resource::environments::Environment;
use mistralclient::resource::workflows::Workflow;
use mistralclient::resource::{
    build_query, filter_matching, is_uuid_like, ListParams, ResourceManager,
};
use mistralclient::{Resource, Result, Transport};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;

/// Transport that answers every GET with the same body
struct CannedTransport {
    body: String,
}

#[async_trait]
impl Transport for CannedTransport {
    async fn get(&self, _path: &str, _headers: &[(&str, &str)]) -> Result<Response> {
        Ok(Response::new(200, self.body.clone()))
    }

    async fn post(
        &self,
        _path: &str,
        _body: String,
        _headers: &[(&str, &str)],
    ) -> Result<Response> {
        Ok(Response::new(201, "{}"))
    }

    async fn put(&self, _path: &str, _body: String, _headers: &[(&str, &str)]) -> Result<Response> {
        Ok(Response::new(200, "{}"))
    }

    async fn delete(&self, _path: &str, _headers: &[(&str, &str)]) -> Result<Response> {
        Ok(Response::new(204, ""))
    }
}

/// Generate arbitrary workflow payloads as the server returns them
fn arb_workflow() -> impl Strategy<Value = Value> {
    (
        "[a-z][a-z0-9_]{0,20}",
        prop_oneof!["", "ns1", "ns2"],
        prop_oneof!["private", "public"],
        prop::option::of("[a-z]{1,8}"),
    )
        .prop_map(|(name, namespace, scope, tag)| {
            let mut wf = json!({"name": name, "namespace": namespace, "scope": scope});
            if let Some(tag) = tag {
                wf["tags"] = json!([tag]);
            }
            wf
        })
}

fn arb_params() -> impl Strategy<Value = ListParams> {
    (
        prop::option::of("[a-z0-9-]{0,12}"),
        prop::option::of(-5i64..500),
        prop::collection::vec("[a-z_]{0,10}", 0..4),
        prop::collection::vec(prop_oneof!["asc", "desc", ""], 0..4),
        prop::collection::vec("[a-z_]{0,10}", 0..4),
        prop::collection::vec(("f_[a-z]{1,8}", ".{0,16}"), 0..4),
    )
        .prop_map(
            |(marker, limit, sort_keys, sort_dirs, fields, filters)| ListParams {
                marker,
                limit,
                sort_keys,
                sort_dirs,
                fields,
                filters,
            },
        )
}

/// Decode a query string produced by `build_query`
fn decode(query: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .into_owned()
        .collect()
}

mod query_tests {
    use super::*;

    proptest! {
        /// Encoded pairs decode back to the same pairs
        #[test]
        fn query_decodes_to_pairs(params in arb_params()) {
            let pairs = params.to_pairs(&[]);
            let query = build_query(&pairs);

            if pairs.is_empty() {
                prop_assert_eq!(query, "");
            } else {
                prop_assert!(query.starts_with('?'));
                prop_assert_eq!(decode(&query), pairs);
            }
        }

        /// Comma-joined lists split back into their non-empty elements
        #[test]
        fn joined_lists_split_back(params in arb_params()) {
            let decoded = decode(&params.query_string(&[]));
            let lists = [
                ("sort_keys", &params.sort_keys),
                ("sort_dirs", &params.sort_dirs),
                ("fields", &params.fields),
            ];

            for (name, input) in lists {
                let expected: Vec<&str> = input
                    .iter()
                    .map(String::as_str)
                    .filter(|v| !v.is_empty())
                    .collect();
                let sent: Vec<&(String, String)> =
                    decoded.iter().filter(|(k, _)| k == name).collect();

                if expected.is_empty() {
                    prop_assert!(sent.is_empty(), "{} sent without values", name);
                } else {
                    prop_assert_eq!(sent.len(), 1);
                    let split: Vec<&str> = sent[0].1.split(',').collect();
                    prop_assert_eq!(split, expected);
                }
            }
        }

        /// Empty values and non-positive limits never reach the wire
        #[test]
        fn no_empty_values(params in arb_params()) {
            for (name, value) in params.to_pairs(&[("task_execution_id", "")]) {
                prop_assert!(!value.is_empty(), "{} was sent empty", name);
                prop_assert_ne!(name.as_str(), "task_execution_id");
                if name == "limit" {
                    prop_assert!(value.parse::<i64>().unwrap() > 0);
                }
            }
        }

        /// Any UUID is recognised, plain names never are
        #[test]
        fn uuid_detection(seed in any::<u128>(), name in "[a-z_]{1,30}") {
            prop_assert!(is_uuid_like(&uuid::Uuid::from_u128(seed).to_string()));
            prop_assert!(!is_uuid_like(&name));
        }
    }
}

mod entity_tests {
    use super::*;

    proptest! {
        /// Filtering keeps exactly the matching entities, in order
        #[test]
        fn filter_is_ordered_subset(
            payloads in prop::collection::vec(arb_workflow(), 0..50),
            scope in prop_oneof!["private", "public"],
        ) {
            let workflows: Vec<Workflow> = payloads
                .into_iter()
                .map(|p| Workflow::from_json(p).unwrap())
                .collect();
            let expected: Vec<Workflow> = workflows
                .iter()
                .filter(|w| w.scope.as_deref() == Some(scope.as_str()))
                .cloned()
                .collect();

            let filtered = filter_matching(workflows, &[("scope", json!(scope))]);
            prop_assert_eq!(filtered, expected);
        }

        /// Missing keys are filled in, present keys are untouched
        #[test]
        fn defaults_fill_only_missing(
            name in "[a-z]{1,
            12}",
            description in prop::option::of(".{0,20}"),
        ) {
            let mut payload = json!({"name": name});
            if let Some(description) = &description {
                payload["description"] = json!(description);
            }
            let env = Environment::from_json(payload).unwrap();

            prop_assert_eq!(env.scope.as_deref(), Some("private"));
            prop_assert_eq!(env.description.clone(), Some(description.unwrap_or_default()));
            prop_assert!(env.to_string().starts_with("<Environment ["));
        }

        /// A list call yields one entity per array element
        #[test]
        fn list_yields_every_item(payloads in prop::collection::vec(arb_workflow(), 0..30)) {
            let count = payloads.len();
            let transport = Arc::new(CannedTransport {
                body: json!({"workflows": payloads}).to_string(),
            });
            let manager: ResourceManager<Workflow> = ResourceManager::new(transport);

            let listed = tokio_test::block_on(manager.list("/workflows", "workflows")).unwrap();
            prop_assert_eq!(listed.len(), count);
            prop_assert!(listed.iter().all(|w| w.scope.is_some()));
        }
    }
}
