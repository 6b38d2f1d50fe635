//! Keycloak (OpenID Connect) authentication
//!
//! Exchanges a user name and password for an access token at the realm's
//! token endpoint, or passes a pre-issued access token through untouched.

use super::{present, AuthRequest, AuthResult};
use crate::error::{Error, Result};
use crate::mistral::http::{build_http_client, sanitize_for_log, TlsOptions};
use serde::Deserialize;

/// OpenID Connect backend
#[derive(Debug, Clone, Copy, Default)]
pub struct KeycloakAuth;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Token endpoint of a Keycloak realm
pub fn token_endpoint(auth_url: &str, realm: &str) -> String {
    format!(
        "{}/realms/{}/protocol/openid-connect/token",
        auth_url.trim_end_matches('/'),
        realm
    )
}

impl KeycloakAuth {
    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult> {
        let creds = &request.credentials;
        let oidc = &request.oidc;

        let auth_url = present(&creds.auth_url).ok_or_else(|| missing("an auth URL"))?;
        let client_id = present(&oidc.client_id).ok_or_else(|| missing("a client id"))?;
        let client_secret =
            present(&oidc.client_secret).ok_or_else(|| missing("a client secret"))?;
        let realm = present(&oidc.realm_name)
            .or_else(|| present(&creds.project_name))
            .ok_or_else(|| missing("a realm name"))?;

        let username = present(&creds.username);
        let password = present(&creds.password);
        let access_token = present(&oidc.access_token);

        let token = match (username.zip(password), access_token) {
            (Some(_), Some(_)) => {
                return Err(Error::Configuration(
                    "User name/password and access token cannot be used together".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::Configuration(
                    "Either a user name with password or an access token is required".to_string(),
                ))
            }
            (None, Some(token)) => token.to_string(),
            (Some((username, password)), None) => {
                let tls = TlsOptions {
                    insecure: creds.insecure,
                    cacert: creds.cacert.clone(),
                    ..Default::default()
                };
                let form = PasswordGrant {
                    client_id,
                    client_secret,
                    username,
                    password,
                };
                request_token(&token_endpoint(auth_url, realm), &form, &tls).await?
            }
        };

        Ok(AuthResult {
            mistral_url: present(&request.mistral_url).map(String::from),
            token: Some(token),
            ..Default::default()
        })
    }
}

fn missing(what: &str) -> Error {
    Error::Configuration(format!("Keycloak authentication requires {}", what))
}

struct PasswordGrant<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    username: &'a str,
    password: &'a str,
}

async fn request_token(url: &str, grant: &PasswordGrant<'_>, tls: &TlsOptions) -> Result<String> {
    let client = build_http_client(url, tls)?;

    let response = client
        .post(url)
        .header("Accept", "application/json")
        .form(&[
            ("grant_type", "password"),
            ("scope", "openid"),
            ("client_id", grant.client_id),
            ("client_secret", grant.client_secret),
            ("username", grant.username),
            ("password", grant.password),
        ])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    tracing::debug!("HTTP POST {} -> {}", url, status.as_u16());

    if !status.is_success() {
        tracing::error!("Keycloak error: {} - {}", status, sanitize_for_log(&body));
        return Err(Error::Auth {
            status: Some(status.as_u16()),
            message: body,
        });
    }

    let token: TokenResponse = serde_json::from_str(&body)?;
    Ok(token.access_token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mistral::auth::{Credentials, OidcParams};

    fn request(username: Option<&str>, access_token: Option<&str>) -> AuthRequest {
        AuthRequest {
            auth_type: Some("keycloak-oidc".into()),
            credentials: Credentials {
                auth_url: Some("http://127.0.0.1:9/auth".into()),
                username: username.map(String::from),
                password: username.map(|_| "pw".to_string()),
                project_name: Some("mistral".into()),
                ..Default::default()
            },
            oidc: OidcParams {
                client_id: Some("cli".into()),
                client_secret: Some("secret".into()),
                realm_name: None,
                access_token: access_token.map(String::from),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_token_endpoint() {
        assert_eq!(
            token_endpoint("https://kc.example.com/auth/", "mistral"),
            "https://kc.example.com/auth/realms/mistral/protocol/openid-connect/token"
        );
    }

    #[tokio::test]
    async fn test_access_token_passes_through() {
        let result = KeycloakAuth
            .authenticate(&request(None, Some("issued")))
            .await
            .unwrap();
        assert_eq!(result.token.as_deref(), Some("issued"));
    }

    #[tokio::test]
    async fn test_both_password_and_token_rejected() {
        let result = KeycloakAuth
            .authenticate(&request(Some("admin"), Some("issued")))
            .await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_neither_password_nor_token_rejected() {
        let result = KeycloakAuth.authenticate(&request(None, None)).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_client_secret_required() {
        let mut req = request(None, Some("issued"));
        req.oidc.client_secret = None;
        let result = KeycloakAuth.authenticate(&req).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_missing_auth_url_message() {
        let mut req = request(None, Some("issued"));
        req.credentials.auth_url = None;
        match KeycloakAuth.authenticate(&req).await {
            Err(Error::Configuration(message)) => {
                assert_eq!(message, "Keycloak authentication requires an auth URL")
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
