//! HTTP transport for Mistral REST API calls
//!
//! One request per call, no retries, no timeouts beyond reqwest's defaults.
//! Session headers (token, project, user, target cloud) are fixed when the
//! transport is built and attached to every request.

use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Certificate, Client, Identity, Method};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::PathBuf;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

pub const CONTENT_TYPE: &str = "content-type";
pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// A completed HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct Response {
    status: u16,
    /// Header names are stored lowercased
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Raw body content
    pub fn text(&self) -> &str {
        &self.body
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// Transport capability used by the resource managers.
///
/// `headers` are merged over the session defaults; a caller value wins for
/// the same header name.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response>;

    async fn post(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response>;

    async fn put(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response>;

    async fn delete(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response>;

    /// Project the session is scoped to, when known
    fn project_id(&self) -> Option<&str> {
        None
    }
}

/// Credentials for a secondary cloud, forwarded on every request.
#[derive(Debug, Clone, Default)]
pub struct TargetSession {
    pub auth_url: String,
    pub auth_token: Option<String>,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub region_name: Option<String>,
    pub user_domain_name: Option<String>,
    pub project_domain_name: Option<String>,
    pub insecure: bool,
    /// JSON-serialized service catalog of the target cloud
    pub service_catalog: Option<String>,
}

/// Default headers derived from the resolved auth context.
#[derive(Debug, Clone, Default)]
pub struct SessionHeaders {
    pub auth_token: Option<String>,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub target: Option<TargetSession>,
}

impl SessionHeaders {
    /// Header pairs attached to every request
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(token) = &self.auth_token {
            pairs.push(("x-auth-token".to_string(), token.clone()));
        }
        if let Some(project_id) = &self.project_id {
            pairs.push(("X-Project-Id".to_string(), project_id.clone()));
        }
        if let Some(user_id) = &self.user_id {
            pairs.push(("X-User-Id".to_string(), user_id.clone()));
        }

        if let Some(target) = &self.target {
            pairs.push(("X-Target-Auth-Uri".to_string(), target.auth_url.clone()));
            if let Some(token) = &target.auth_token {
                pairs.push(("X-Target-Auth-Token".to_string(), token.clone()));
            }
            pairs.push((
                "X-Target-Insecure".to_string(),
                if target.insecure { "True" } else { "False" }.to_string(),
            ));
            if let Some(catalog) = &target.service_catalog {
                pairs.push((
                    "X-Target-Service-Catalog".to_string(),
                    STANDARD.encode(catalog.as_bytes()),
                ));
            }

            let optional = [
                ("X-Target-Project-Id", &target.project_id),
                ("X-Target-User-Id", &target.user_id),
                ("X-Target-Region-Name", &target.region_name),
                ("X-Target-User-Domain-Name", &target.user_domain_name),
                ("X-Target-Project-Domain-Name", &target.project_domain_name),
            ];
            for (name, value) in optional {
                if let Some(value) = value {
                    pairs.push((name.to_string(), value.clone()));
                }
            }
        }

        pairs
    }
}

/// Merge caller headers over session defaults, case-insensitively.
pub fn merge_headers(
    defaults: &[(String, String)],
    overrides: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = defaults
        .iter()
        .filter(|(name, _)| {
            !overrides
                .iter()
                .any(|(o, _)| o.eq_ignore_ascii_case(name))
        })
        .cloned()
        .collect();

    merged.extend(overrides.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    merged
}

/// TLS settings for HTTPS endpoints
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    /// Disable certificate verification
    pub insecure: bool,
    /// Custom CA bundle (PEM)
    pub cacert: Option<PathBuf>,
    /// Client certificate (PEM)
    pub cert: Option<PathBuf>,
    /// Client private key (PEM); may be bundled inside `cert`
    pub key: Option<PathBuf>,
}

/// Build a reqwest client honoring the TLS options for `base_url`.
pub(crate) fn build_http_client(base_url: &str, tls: &TlsOptions) -> Result<Client> {
    let mut builder =
        Client::builder().user_agent(concat!("mistralclient/", env!("CARGO_PKG_VERSION")));

    if base_url.starts_with("https") {
        if let Some(cacert) = &tls.cacert {
            if !cacert.exists() {
                return Err(Error::Configuration(format!(
                    "CA certificate file does not exist: {}",
                    cacert.display()
                )));
            }
            if tls.insecure {
                tracing::warn!(
                    "Client is set to not verify even though cacert is provided; \
                     certificate verification stays disabled"
                );
            }
        }

        if tls.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        } else if let Some(cacert) = &tls.cacert {
            let pem = std::fs::read(cacert).map_err(|e| {
                Error::Configuration(format!("cannot read {}: {}", cacert.display(), e))
            })?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|e| Error::Configuration(format!("invalid CA bundle: {}", e)))?;
            builder = builder.add_root_certificate(certificate);
        }

        if let Some(cert) = &tls.cert {
            let mut pem = std::fs::read(cert).map_err(|e| {
                Error::Configuration(format!("cannot read {}: {}", cert.display(), e))
            })?;
            if let Some(key) = &tls.key {
                let key_pem = std::fs::read(key).map_err(|e| {
                    Error::Configuration(format!("cannot read {}: {}", key.display(), e))
                })?;
                pem.push(b'\n');
                pem.extend(key_pem);
            }
            let identity = Identity::from_pem(&pem)
                .map_err(|e| Error::Configuration(format!("invalid client certificate: {}", e)))?;
            builder = builder.identity(identity);
        }
    }

    builder
        .build()
        .map_err(|e| Error::Configuration(format!("failed to create HTTP client: {}", e)))
}

/// reqwest-backed [`Transport`]
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    session: SessionHeaders,
    default_headers: Vec<(String, String)>,
}

impl HttpTransport {
    /// Create a transport bound to `base_url`.
    ///
    /// Fails with a configuration error when the URL does not parse or a
    /// CA bundle is named but missing.
    pub fn new(base_url: &str, session: SessionHeaders, tls: &TlsOptions) -> Result<Self> {
        url::Url::parse(base_url).map_err(|e| {
            Error::Configuration(format!("invalid Mistral URL '{}': {}", base_url, e))
        })?;

        let client = build_http_client(base_url, tls)?;
        let default_headers = session.to_pairs();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            default_headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionHeaders {
        &self.session
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in merge_headers(&self.default_headers, headers) {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!("HTTP {} {} failed: {}", method, url, e);
            Error::Http(e)
        })?;

        let status = response.status().as_u16();
        let mut collected = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                collected.insert(name.as_str().to_ascii_lowercase(), value.to_string());
            }
        }
        let body = response.text().await?;

        tracing::debug!("HTTP {} {} -> {}", method, url, status);
        if status >= 400 {
            tracing::debug!("Response body: {}", sanitize_for_log(&body));
        }

        Ok(Response {
            status,
            headers: collected,
            body,
        })
    }
}

/// Add the JSON content type unless the caller chose one.
fn with_content_type<'a>(headers: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    let mut headers = headers.to_vec();
    if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE)) {
        headers.push((CONTENT_TYPE, APPLICATION_JSON));
    }
    headers
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::GET, path, None, headers).await
    }

    async fn post(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response> {
        let headers = with_content_type(headers);
        self.request(Method::POST, path, Some(body), &headers).await
    }

    async fn put(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response> {
        let headers = with_content_type(headers);
        self.request(Method::PUT, path, Some(body), &headers).await
    }

    async fn delete(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::DELETE, path, None, headers).await
    }

    fn project_id(&self) -> Option<&str> {
        self.session.project_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_caller_headers_override_session_defaults() {
        let session = SessionHeaders {
            auth_token: Some("session-token".into()),
            project_id: Some("p1".into()),
            ..Default::default()
        };
        let merged = merge_headers(&session.to_pairs(), &[("X-Auth-Token", "override")]);

        let tokens: Vec<_> = merged
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("x-auth-token"))
            .collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].1, "override");
        assert!(merged.iter().any(|(k, v)| k == "X-Project-Id" && v == "p1"));
    }

    #[test]
    fn test_target_headers_only_when_target_present() {
        let plain = SessionHeaders {
            auth_token: Some("t".into()),
            ..Default::default()
        };
        assert!(!plain.to_pairs().iter().any(|(k, _)| k.starts_with("X-Target")));

        let with_target = SessionHeaders {
            auth_token: Some("t".into()),
            target: Some(TargetSession {
                auth_url: "https://target/v3".into(),
                auth_token: Some("tt".into()),
                service_catalog: Some("[]".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let pairs = with_target.to_pairs();
        assert!(pairs.contains(&("X-Target-Auth-Uri".into(), "https://target/v3".into())));
        assert!(pairs.contains(&("X-Target-Auth-Token".into(), "tt".into())));
        assert!(pairs.contains(&("X-Target-Service-Catalog".into(), STANDARD.encode("[]"))));
        assert!(!pairs.iter().any(|(k, _)| k == "X-Target-Project-Id"));
    }

    #[test]
    fn test_content_type_defaults_to_json() {
        let headers = with_content_type(&[]);
        assert_eq!(headers, vec![(CONTENT_TYPE, APPLICATION_JSON)]);

        let headers = with_content_type(&[("Content-Type", TEXT_PLAIN)]);
        assert_eq!(headers, vec![("Content-Type", TEXT_PLAIN)]);
    }

    #[test]
    fn test_missing_cacert_is_configuration_error() {
        let tls = TlsOptions {
            cacert: Some(PathBuf::from("/nonexistent/ca-bundle.pem")),
            ..Default::default()
        };
        let result = HttpTransport::new(
            "https://mistral.example.com:8989/v2",
            SessionHeaders::default(),
            &tls,
        );
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_cacert_ignored_for_plain_http() {
        let tls = TlsOptions {
            cacert: Some(PathBuf::from("/nonexistent/ca-bundle.pem")),
            ..Default::default()
        };
        let result =
            HttpTransport::new("http://localhost:8989/v2", SessionHeaders::default(), &tls);
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result =
            HttpTransport::new("not a url", SessionHeaders::default(), &TlsOptions::default());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_response_header_lookup_is_case_insensitive() {
        let response = Response::new(500, "").with_header("Server-Error-Message", "boom");
        assert_eq!(response.header("server-error-message"), Some("boom"));
    }
}
