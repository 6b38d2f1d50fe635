//! Keystone v3 authentication
//!
//! Issues a token through `POST /v3/auth/tokens` with either the `token`
//! or the `password` method, scoped to a project when one is given.

use super::{present, AuthRequest, AuthResult, Credentials, TargetAuth};
use crate::error::{Error, Result};
use crate::mistral::catalog::ServiceCatalog;
use crate::mistral::http::{build_http_client, sanitize_for_log, TlsOptions};
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Header carrying the issued token
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";

/// Domain assumed when a name is given without a domain
const DEFAULT_DOMAIN: &str = "Default";

/// Token/password backend
#[derive(Debug, Clone, Copy, Default)]
pub struct KeystoneAuth;

/// A token issued by Keystone
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub catalog: ServiceCatalog,
}

#[derive(Debug, Deserialize)]
struct TokenEnvelope {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    project: Option<IdRef>,
    #[serde(default)]
    user: Option<IdRef>,
    #[serde(default)]
    catalog: Option<ServiceCatalog>,
}

#[derive(Debug, Deserialize)]
struct IdRef {
    id: String,
}

impl KeystoneAuth {
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult> {
        let creds = &request.credentials;

        if !creds.is_usable() {
            tracing::debug!("Neither token nor user/password given, skipping authentication");
            return Ok(AuthResult {
                mistral_url: request.mistral_url.clone(),
                ..Default::default()
            });
        }

        let Some(auth_url) = present(&creds.auth_url) else {
            // A bare token with an explicit endpoint needs no identity service
            return Ok(AuthResult {
                mistral_url: request.mistral_url.clone(),
                token: present(&creds.token).map(String::from),
                project_id: present(&creds.project_id).map(String::from),
                user_id: present(&creds.user_id).map(String::from),
                ..Default::default()
            });
        };

        let issued = issue_token(auth_url, creds).await?;

        let mistral_url = match present(&request.mistral_url) {
            Some(url) => Some(url.to_string()),
            None => {
                let resolved = issued.catalog.resolve_endpoint(
                    request.service_type(),
                    request.endpoint_type(),
                    present(&creds.region_name),
                );
                if resolved.is_none() {
                    tracing::debug!(
                        "No '{}' endpoint in the service catalog, using the default URL",
                        request.service_type()
                    );
                }
                resolved
            }
        };

        Ok(AuthResult {
            mistral_url,
            token: Some(issued.token),
            project_id: issued.project_id,
            user_id: issued.user_id,
            catalog: Some(issued.catalog),
            target: None,
        })
    }
}

/// Authenticate against the target cloud. Any failure is fatal.
pub async fn authenticate_target(creds: &Credentials) -> Result<TargetAuth> {
    let Some(auth_url) = present(&creds.auth_url) else {
        return Err(Error::Configuration("Target auth URL is required".to_string()));
    };
    if !creds.is_usable() {
        return Err(Error::Configuration(
            "Target cloud requires a token or a user name and password".to_string(),
        ));
    }

    let issued = issue_token(auth_url, creds).await?;
    tracing::debug!("Target session established against {}", auth_url);

    Ok(TargetAuth {
        auth_url: auth_url.to_string(),
        token: issued.token,
        project_id: issued.project_id,
        user_id: issued.user_id,
        region_name: present(&creds.region_name).map(String::from),
        user_domain_name: present(&creds.user_domain_name).map(String::from),
        project_domain_name: present(&creds.project_domain_name).map(String::from),
        insecure: creds.insecure,
        catalog: issued.catalog,
    })
}

/// Token endpoint for an identity URL with or without a version suffix
pub fn tokens_url(auth_url: &str) -> String {
    let base = auth_url.trim_end_matches('/');
    let base = base.strip_suffix("/v2.0").unwrap_or(base);
    if base.ends_with("/v3") {
        format!("{}/auth/tokens", base)
    } else {
        format!("{}/v3/auth/tokens", base)
    }
}

fn domain(id: &Option<String>, name: &Option<String>) -> Value {
    match (present(id), present(name)) {
        (Some(id), _) => json!({ "id": id }),
        (None, Some(name)) => json!({ "name": name }),
        (None, None) => json!({ "name": DEFAULT_DOMAIN }),
    }
}

/// Build the v3 auth request body
pub fn auth_body(creds: &Credentials) -> Value {
    let identity = if let Some(token) = present(&creds.token) {
        json!({
            "methods": ["token"],
            "token": { "id": token }
        })
    } else {
        let mut user = Map::new();
        if let Some(user_id) = present(&creds.user_id) {
            user.insert("id".into(), json!(user_id));
        } else if let Some(username) = present(&creds.username) {
            user.insert("name".into(), json!(username));
            user.insert(
                "domain".into(),
                domain(&creds.user_domain_id, &creds.user_domain_name),
            );
        }
        user.insert(
            "password".into(),
            json!(present(&creds.password).unwrap_or_default()),
        );
        json!({
            "methods": ["password"],
            "password": { "user": user }
        })
    };

    let scope = if let Some(project_id) = present(&creds.project_id) {
        Some(json!({ "project": { "id": project_id } }))
    } else {
        present(&creds.project_name).map(|name| {
            json!({
                "project": {
                    "name": name,
                    "domain": domain(&creds.project_domain_id, &creds.project_domain_name)
                }
            })
        })
    };

    let mut auth = Map::new();
    auth.insert("identity".into(), identity);
    if let Some(scope) = scope {
        auth.insert("scope".into(), scope);
    }
    json!({ "auth": auth })
}

/// Request a token from Keystone.
pub async fn issue_token(auth_url: &str, creds: &Credentials) -> Result<IssuedToken> {
    let tls = TlsOptions {
        insecure: creds.insecure,
        cacert: creds.cacert.clone(),
        ..Default::default()
    };
    let client = build_http_client(auth_url, &tls)?;
    let url = tokens_url(auth_url);

    let response = client.post(&url).json(&auth_body(creds)).send().await?;
    let status = response.status();
    let token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let body = response.text().await?;

    tracing::debug!("HTTP POST {} -> {}", url, status.as_u16());

    if !status.is_success() {
        tracing::error!("Keystone error: {} - {}", status, sanitize_for_log(&body));
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(body);
        return Err(Error::Auth {
            status: Some(status.as_u16()),
            message,
        });
    }

    let Some(token) = token else {
        return Err(Error::Auth {
            status: Some(status.as_u16()),
            message: format!("Keystone response carried no {} header", SUBJECT_TOKEN_HEADER),
        });
    };

    let envelope: TokenEnvelope = serde_json::from_str(&body)?;

    Ok(IssuedToken {
        token,
        project_id: envelope.token.project.map(|p| p.id),
        user_id: envelope.token.user.map(|u| u.id),
        catalog: envelope.token.catalog.unwrap_or_default(),
    })
}
