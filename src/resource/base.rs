//! Generic resource entity and CRUD manager
//!
//! Every resource type shares one wire protocol: JSON objects in, JSON
//! objects out, a named array for list responses, and a fixed success
//! status per verb. [`ResourceManager`] implements that protocol once;
//! the per-resource managers only decide URLs and payloads.

use crate::error::{ApiError, Error, Result};
use crate::mistral::http::{Response, Transport, CONTENT_TYPE, TEXT_PLAIN};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// Header the server uses for human-readable failure details
pub const SERVER_ERROR_MESSAGE_HEADER: &str = "Server-Error-Message";

/// Build an immutable defaults table
pub fn defaults_table(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// A snapshot of one remote object.
///
/// Implementors are plain structs with the modeled fields plus a flattened
/// `extra` map for anything the server adds later.
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Display name, e.g. `Workflow`
    const RESOURCE_NAME: &'static str;

    /// Values filled in for keys missing from a payload
    fn defaults() -> &'static Map<String, Value> {
        static EMPTY: OnceLock<Map<String, Value>> = OnceLock::new();
        EMPTY.get_or_init(Map::new)
    }

    /// Keys the server sent that no modeled field covers
    fn extra_mut(&mut self) -> &mut Map<String, Value>;

    /// Decode a payload after filling absent default keys.
    ///
    /// Null values stay visible in [`Resource::to_dict`]: defaulted fields
    /// serialize `None` as null, other null keys are kept in `extra`.
    fn from_json(value: Value) -> Result<Self> {
        let Value::Object(mut map) = value else {
            return Ok(serde_json::from_value(value)?);
        };

        let defaults = Self::defaults();
        for (key, default) in defaults {
            map.entry(key.clone()).or_insert_with(|| default.clone());
        }
        let nulls: Vec<String> = map
            .iter()
            .filter(|(key, value)| value.is_null() && !defaults.contains_key(*key))
            .map(|(key, _)| key.clone())
            .collect();

        let mut entity: Self = serde_json::from_value(Value::Object(map))?;
        let extra = entity.extra_mut();
        for key in nulls {
            extra.insert(key, Value::Null);
        }
        Ok(entity)
    }

    /// Owned copy of the entity's fields
    fn to_dict(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// `<Name [k='v', ...]>` rendering used by `Display`
    fn describe(&self) -> String {
        let dict = self.to_dict();
        let mut entries: Vec<(&String, &Value)> = dict.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        let fields: Vec<String> = entries
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{}='{}'", k, s),
                other => format!("{}='{}'", k, other),
            })
            .collect();
        format!("<{} [{}]>", Self::RESOURCE_NAME, fields.join(", "))
    }
}

/// Implement `Display` through [`Resource::describe`]
#[macro_export]
macro_rules! impl_resource_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl std::fmt::Display for $ty {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(&$crate::resource::Resource::describe(self))
                }
            }
        )+
    };
}

/// Request body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Serialized as JSON, sent as `application/json`
    Json(Value),
    /// Sent verbatim as `text/plain`
    Text(String),
}

impl Payload {
    pub fn json<T: Serialize>(body: &T) -> Result<Self> {
        Ok(Payload::Json(serde_json::to_value(body)?))
    }

    pub fn text(body: impl Into<String>) -> Self {
        Payload::Text(body.into())
    }

    fn encode(self) -> Result<(String, Option<(&'static str, &'static str)>)> {
        match self {
            Payload::Json(value) => Ok((serde_json::to_string(&value)?, None)),
            Payload::Text(text) => Ok((text, Some((CONTENT_TYPE, TEXT_PLAIN)))),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Verb {
    Post,
    Put,
}

/// Extract the failure message from an unexpected response.
///
/// Precedence: `Server-Error-Message` header, then `faultstring` from the
/// JSON body, then the raw body.
pub fn translate_error(response: &Response) -> ApiError {
    let status = response.status();

    if let Some(message) = response
        .header(SERVER_ERROR_MESSAGE_HEADER)
        .filter(|m| !m.is_empty())
    {
        return ApiError::new(status, message);
    }

    let message = match response.json::<Value>() {
        Ok(body) => body
            .get("faultstring")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(String::from)
            .unwrap_or_else(|| response.text().to_string()),
        Err(_) => response.text().to_string(),
    };

    let message = if message.is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string()
    } else {
        message
    };

    ApiError::new(status, message)
}

/// Surface transport failures as API errors without an HTTP status
fn transport_failure(err: Error) -> Error {
    match err {
        Error::Http(e) => Error::Api(ApiError::new(
            e.status().map(|s| s.as_u16()).unwrap_or(0),
            e.to_string(),
        )),
        other => other,
    }
}

fn expect_status(response: Response, expected: u16) -> Result<Response> {
    if response.status() == expected {
        Ok(response)
    } else {
        let err = translate_error(&response);
        tracing::debug!("Unexpected status {}: {}", err.error_code, err.error_message);
        Err(Error::Api(err))
    }
}

fn decode_body(response: &Response) -> Result<Value> {
    if response.text().trim().is_empty() {
        return Ok(Value::Null);
    }
    response.json::<Value>().map_err(|e| {
        Error::Api(ApiError::new(
            response.status(),
            format!("invalid JSON in response: {}", e),
        ))
    })
}

/// Generic CRUD over one resource type
pub struct ResourceManager<R> {
    transport: Arc<dyn Transport>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for ResourceManager<R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> ResourceManager<R> {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            _resource: PhantomData,
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Fail with a 400 naming the first empty field, before any request.
    pub fn ensure_not_empty(&self, fields: &[(&str, &str)]) -> Result<()> {
        for (name, value) in fields {
            if value.is_empty() {
                return Err(Error::bad_request(format!(
                    "{} is missing field \"{}\"",
                    R::RESOURCE_NAME,
                    name
                )));
            }
        }
        Ok(())
    }

    async fn send(&self, verb: Verb, url: &str, payload: Payload) -> Result<Response> {
        let (body, content_type) = payload.encode()?;
        let headers: Vec<(&str, &str)> = content_type.into_iter().collect();

        let response = match verb {
            Verb::Post => self.transport.post(url, body, &headers).await,
            Verb::Put => self.transport.put(url, body, &headers).await,
        };
        response.map_err(transport_failure)
    }

    async fn fetch(&self, url: &str) -> Result<Response> {
        self.transport.get(url, &[]).await.map_err(transport_failure)
    }

    /// POST expecting 201 and a single object
    pub async fn create(&self, url: &str, payload: Payload) -> Result<R> {
        self.create_expecting(url, payload, 201).await
    }

    /// POST with a custom success status
    pub async fn create_expecting(&self, url: &str, payload: Payload, expected: u16) -> Result<R> {
        let response = expect_status(self.send(Verb::Post, url, payload).await?, expected)?;
        R::from_json(decode_body(&response)?)
    }

    /// POST expecting 201 and a batch of objects under `response_key`
    pub async fn create_many(
        &self,
        url: &str,
        payload: Payload,
        response_key: &str,
    ) -> Result<Vec<R>> {
        let response = expect_status(self.send(Verb::Post, url, payload).await?, 201)?;
        extract_many(decode_body(&response)?, response_key)
    }

    /// PUT expecting 200 and a single object
    pub async fn update(&self, url: &str, payload: Payload) -> Result<R> {
        let response = expect_status(self.send(Verb::Put, url, payload).await?, 200)?;
        R::from_json(decode_body(&response)?)
    }

    /// PUT expecting 200 and a batch of objects under `response_key`
    pub async fn update_many(
        &self,
        url: &str,
        payload: Payload,
        response_key: &str,
    ) -> Result<Vec<R>> {
        let response = expect_status(self.send(Verb::Put, url, payload).await?, 200)?;
        extract_many(decode_body(&response)?, response_key)
    }

    /// GET expecting 200 and an array under `response_key`
    pub async fn list(&self, url: &str, response_key: &str) -> Result<Vec<R>> {
        let response = expect_status(self.fetch(url).await?, 200)?;
        let body = decode_body(&response)?;

        match body.get(response_key) {
            Some(Value::Array(items)) => items.iter().cloned().map(R::from_json).collect(),
            _ => {
                tracing::debug!("No '{}' array in list response", response_key);
                Ok(Vec::new())
            }
        }
    }

    /// GET expecting 200 and a single object
    pub async fn get(&self, url: &str) -> Result<R> {
        let response = expect_status(self.fetch(url).await?, 200)?;
        R::from_json(decode_body(&response)?)
    }

    /// DELETE expecting 204
    pub async fn delete(&self, url: &str) -> Result<()> {
        let response = self.transport.delete(url, &[]).await.map_err(transport_failure)?;
        expect_status(response, 204)?;
        Ok(())
    }

    /// List, then keep entities whose fields equal every given filter.
    ///
    /// Filtering is client-side only.
    pub async fn find(
        &self,
        url: &str,
        response_key: &str,
        filters: &[(&str, Value)],
    ) -> Result<Vec<R>> {
        let items = self.list(url, response_key).await?;
        Ok(filter_matching(items, filters))
    }

    /// GET expecting 200, returning the undecoded JSON body
    pub async fn get_json(&self, url: &str) -> Result<Value> {
        let response = expect_status(self.fetch(url).await?, 200)?;
        decode_body(&response)
    }

    /// POST with a custom success status, returning the undecoded JSON body
    pub async fn post_json(&self, url: &str, payload: Payload, expected: u16) -> Result<Value> {
        let response = expect_status(self.send(Verb::Post, url, payload).await?, expected)?;
        decode_body(&response)
    }
}

/// Batch responses carry a named array; a bare object is a batch of one.
fn extract_many<R: Resource>(body: Value, response_key: &str) -> Result<Vec<R>> {
    match body {
        Value::Object(mut map) => match map.remove(response_key) {
            Some(Value::Array(items)) => items.into_iter().map(R::from_json).collect(),
            Some(other) => {
                map.insert(response_key.to_string(), other);
                Ok(vec![R::from_json(Value::Object(map))?])
            }
            None => Ok(vec![R::from_json(Value::Object(map))?]),
        },
        Value::Array(items) => items.into_iter().map(R::from_json).collect(),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![R::from_json(other)?]),
    }
}

/// Exact-match filter over entity fields
pub fn filter_matching<R: Resource>(items: Vec<R>, filters: &[(&str, Value)]) -> Vec<R> {
    if filters.is_empty() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let dict = item.to_dict();
            filters
                .iter()
                .all(|(key, expected)| dict.get(*key) == Some(expected))
        })
        .collect()
}

/// True when `value` parses as a UUID
pub fn is_uuid_like(value: &str) -> bool {
    uuid::Uuid::parse_str(value).is_ok()
}

/// JSON-encode a structured argument the way the API expects it inside a body.
///
/// A string is taken as already-encoded JSON and must parse.
pub fn encode_json_argument(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(_) => Ok(raw.clone()),
            Err(e) => Err(Error::IllegalArgument(format!(
                "{} is not valid JSON: {}",
                name, e
            ))),
        },
        other => Ok(serde_json::to_string(other)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::MockTransport;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(flatten)]
        extra: Map<String, Value>,
    }

    impl Resource for Widget {
        const RESOURCE_NAME: &'static str = "Widget";

        fn extra_mut(&mut self) -> &mut Map<String, Value> {
            &mut self.extra
        }

        fn defaults() -> &'static Map<String, Value> {
            static DEFAULTS: OnceLock<Map<String, Value>> = OnceLock::new();
            DEFAULTS.get_or_init(|| defaults_table(&[("color", json!("blue"))]))
        }
    }

    crate::impl_resource_display!(Widget);

    fn manager(mock: &Arc<MockTransport>) -> ResourceManager<Widget> {
        ResourceManager::new(mock.clone())
    }

    #[test]
    fn test_defaults_fill_missing_keys() {
        let widget = Widget::from_json(json!({"id": "1"})).unwrap();
        assert_eq!(widget.color.as_deref(), Some("blue"));

        let widget = Widget::from_json(json!({"id": "1", "color": "red"})).unwrap();
        assert_eq!(widget.color.as_deref(), Some("red"));
    }

    #[test]
    fn test_unknown_fields_kept_in_extra() {
        let widget = Widget::from_json(json!({"id": "1", "weight": 3})).unwrap();
        assert_eq!(widget.extra.get("weight"), Some(&json!(3)));
        assert_eq!(widget.to_dict().get("weight"), Some(&json!(3)));
    }

    #[test]
    fn test_null_values_keep_their_keys() {
        let widget =
            Widget::from_json(json!({"id": "1", "name": null, "color": null, "weight": null}))
                .unwrap();
        assert_eq!(widget.color, None);

        let dict = widget.to_dict();
        let mut keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["color", "id", "name", "weight"]);
        assert_eq!(dict.get("name"), Some(&Value::Null));
        assert_eq!(dict.get("color"), Some(&Value::Null));
    }

    #[test]
    fn test_find_matches_null() {
        let widgets = vec![
            Widget::from_json(json!({"id": "1", "name": null})).unwrap(),
            Widget::from_json(json!({"id": "2", "name": "w"})).unwrap(),
            Widget::from_json(json!({"id": "3"})).unwrap(),
        ];
        let found = filter_matching(widgets, &[("name", Value::Null)]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_deref(), Some("1"));
    }

    #[test]
    fn test_to_dict_is_a_copy() {
        let widget = Widget::from_json(json!({"id": "1", "name": "w"})).unwrap();
        let mut dict = widget.to_dict();
        dict.insert("name".into(), json!("changed"));
        assert_eq!(widget.name.as_deref(), Some("w"));
        assert_eq!(widget.to_dict().get("name"), Some(&json!("w")));
    }

    #[test]
    fn test_display() {
        let widget = Widget::from_json(json!({"id": "1", "name": "w"})).unwrap();
        assert_eq!(widget.to_string(), "<Widget [color='blue', id='1', name='w']>");
    }

    #[test]
    fn test_error_message_prefers_header() {
        let response = Response::new(500, r#"{"faultstring": "from body"}"#)
            .with_header(SERVER_ERROR_MESSAGE_HEADER, "from header");
        let err = translate_error(&response);
        assert_eq!(err.error_code, 500);
        assert_eq!(err.error_message, "from header");
    }

    #[test]
    fn test_empty_error_header_ignored() {
        let response = Response::new(500, r#"{"faultstring": "boom"}"#)
            .with_header(SERVER_ERROR_MESSAGE_HEADER, "");
        assert_eq!(translate_error(&response).error_message, "boom");
    }

    #[test]
    fn test_error_message_from_faultstring() {
        let response = Response::new(409, r#"{"faultstring": "duplicate"}"#);
        assert_eq!(translate_error(&response).error_message, "duplicate");
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        let response = Response::new(502, "<html>Bad Gateway</html>");
        let err = translate_error(&response);
        assert_eq!(err.error_code, 502);
        assert_eq!(err.error_message, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_error_message_empty_body_uses_reason() {
        let err = translate_error(&Response::new(404, ""));
        assert_eq!(err.error_message, "Not Found");
    }

    #[tokio::test]
    async fn test_ensure_not_empty_skips_transport() {
        let mock = MockTransport::new();
        let err = manager(&mock)
            .ensure_not_empty(&[("name", "")])
            .unwrap_err();
        let api = err.api().unwrap();
        assert_eq!(api.error_code, 400);
        assert_eq!(api.error_message, "Widget is missing field \"name\"");
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_expects_201() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"id": "1"}"#);
        let result = manager(&mock)
            .create("/widgets", Payload::json(&json!({"name": "w"})).unwrap())
            .await;
        assert_eq!(result.unwrap_err().api().unwrap().error_code, 200);

        mock.respond(201, r#"{"id": "1"}"#);
        let widget = manager(&mock)
            .create("/widgets", Payload::json(&json!({"name": "w"})).unwrap())
            .await
            .unwrap();
        assert_eq!(widget.id.as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_text_payload_sets_content_type() {
        let mock = MockTransport::new();
        mock.respond(201, r#"{"widgets": [{"id": "1"}, {"id": "2"}]}"#);
        let widgets = manager(&mock)
            .create_many("/widgets", Payload::text("definition"), "widgets")
            .await
            .unwrap();
        assert_eq!(widgets.len(), 2);

        let call = mock.last_call().unwrap();
        assert_eq!(call.method, "POST");
        assert_eq!(call.body.as_deref(), Some("definition"));
        assert_eq!(call.header(CONTENT_TYPE), Some(TEXT_PLAIN));
    }

    #[tokio::test]
    async fn test_create_many_accepts_single_object() {
        let mock = MockTransport::new();
        mock.respond(201, r#"{"id": "1", "name": "w"}"#);
        let widgets = manager(&mock)
            .create_many("/widgets", Payload::text("definition"), "widgets")
            .await
            .unwrap();
        assert_eq!(widgets.len(), 1);
        assert_eq!(widgets[0].name.as_deref(), Some("w"));
    }

    #[tokio::test]
    async fn test_delete_success_and_failure() {
        let mock = MockTransport::new();
        mock.respond(204, "");
        manager(&mock).delete("/widgets/1").await.unwrap();

        mock.respond(404, r#"{"faultstring": "not found"}"#);
        let err = manager(&mock).delete("/widgets/2").await.unwrap_err();
        assert_eq!(err.api().unwrap(), &ApiError::new(404, "not found"));
    }

    #[tokio::test]
    async fn test_list_missing_key_is_empty() {
        let mock = MockTransport::new();
        mock.respond(200, r#"{"next": null}"#);
        let widgets = manager(&mock).list("/widgets", "widgets").await.unwrap();
        assert!(widgets.is_empty());
    }

    #[tokio::test]
    async fn test_find_filters_client_side() {
        let mock = MockTransport::new();
        mock.respond(
            200,
            r#"{"widgets": [{"id": "1", "color": "red"}, {"id": "2"}, {"id": "3", "color": "red"}]}"#,
        );
        let red = manager(&mock)
            .find("/widgets", "widgets", &[("color", json!("red"))])
            .await
            .unwrap();
        let ids: Vec<_> = red.iter().filter_map(|w| w.id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(mock.calls()[0].path, "/widgets");
    }

    #[test]
    fn test_encode_json_argument() {
        assert_eq!(encode_json_argument("input", &json!({"a": 1})).unwrap(), r#"{"a":1}"#);
        assert_eq!(encode_json_argument("input", &json!("[1, 2]")).unwrap(), "[1, 2]");
        assert!(matches!(
            encode_json_argument("input", &json!("{oops")),
            Err(Error::IllegalArgument(_))
        ));
    }

    #[test]
    fn test_uuid_detection() {
        assert!(is_uuid_like("123e4567-e89b-12d3-a456-426614174000"));
        assert!(!is_uuid_like("my_workflow"));
    }
}
