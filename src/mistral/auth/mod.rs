//! Authentication negotiation
//!
//! Turns caller-supplied credentials into the token, project, user and
//! endpoint a [`crate::mistral::client::MistralClient`] needs. Two backends
//! exist: Keystone (token or password) and Keycloak (OpenID Connect).
//!
//! Primary authentication degrades gracefully: with no usable credential the
//! result is empty and the client can still be built for local-only work.
//! Target-cloud authentication has no such fallback.

pub mod keycloak;
pub mod keystone;

use crate::error::{Error, Result};
use crate::mistral::catalog::{ServiceCatalog, DEFAULT_INTERFACE, DEFAULT_SERVICE_TYPE};
use crate::mistral::http::{SessionHeaders, TargetSession};
use std::path::PathBuf;

pub use keycloak::KeycloakAuth;
pub use keystone::KeystoneAuth;

/// Credentials for one cloud
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub project_name: Option<String>,
    pub project_id: Option<String>,
    pub user_domain_name: Option<String>,
    pub user_domain_id: Option<String>,
    pub project_domain_name: Option<String>,
    pub project_domain_id: Option<String>,
    pub token: Option<String>,
    pub region_name: Option<String>,
    pub insecure: bool,
    pub cacert: Option<PathBuf>,
}

/// Treat empty strings the same as absent values
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Credentials {
    /// Reject contradictory identity or scope parameters.
    pub fn validate(&self) -> Result<()> {
        if present(&self.project_name).is_some() && present(&self.project_id).is_some() {
            return Err(Error::Configuration(
                "Only project name or project id should be set".to_string(),
            ));
        }
        if present(&self.username).is_some() && present(&self.user_id).is_some() {
            return Err(Error::Configuration(
                "Only user name or user id should be set".to_string(),
            ));
        }
        Ok(())
    }

    /// True when a token or a password with a user identity is present
    pub fn is_usable(&self) -> bool {
        present(&self.token).is_some()
            || (present(&self.password).is_some()
                && (present(&self.username).is_some() || present(&self.user_id).is_some()))
    }
}

/// OpenID Connect client registration
#[derive(Debug, Clone, Default)]
pub struct OidcParams {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Realm; falls back to the project name
    pub realm_name: Option<String>,
    /// Pre-issued access token
    pub access_token: Option<String>,
}

/// Everything the negotiator consumes
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    /// Backend key: `keystone` (default) or `keycloak-oidc`
    pub auth_type: Option<String>,
    pub credentials: Credentials,
    pub oidc: OidcParams,
    /// Explicit Mistral endpoint, skips catalog lookup
    pub mistral_url: Option<String>,
    pub service_type: Option<String>,
    pub endpoint_type: Option<String>,
    /// Present when a target cloud is configured
    pub target: Option<Credentials>,
}

impl AuthRequest {
    pub fn service_type(&self) -> &str {
        present(&self.service_type).unwrap_or(DEFAULT_SERVICE_TYPE)
    }

    pub fn endpoint_type(&self) -> &str {
        present(&self.endpoint_type).unwrap_or(DEFAULT_INTERFACE)
    }
}

/// Resolved target-cloud session
#[derive(Debug, Clone, Default)]
pub struct TargetAuth {
    pub auth_url: String,
    pub token: String,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub region_name: Option<String>,
    pub user_domain_name: Option<String>,
    pub project_domain_name: Option<String>,
    pub insecure: bool,
    pub catalog: ServiceCatalog,
}

/// Outcome of negotiation. All fields empty in degraded mode.
#[derive(Debug, Clone, Default)]
pub struct AuthResult {
    pub mistral_url: Option<String>,
    pub token: Option<String>,
    pub project_id: Option<String>,
    pub user_id: Option<String>,
    pub catalog: Option<ServiceCatalog>,
    pub target: Option<TargetAuth>,
}

impl AuthResult {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Default headers for the transport built from this result
    pub fn session_headers(&self) -> Result<SessionHeaders> {
        let target = match &self.target {
            Some(target) => Some(TargetSession {
                auth_url: target.auth_url.clone(),
                auth_token: Some(target.token.clone()),
                project_id: target.project_id.clone(),
                user_id: target.user_id.clone(),
                region_name: target.region_name.clone(),
                user_domain_name: target.user_domain_name.clone(),
                project_domain_name: target.project_domain_name.clone(),
                insecure: target.insecure,
                service_catalog: Some(target.catalog.to_json()?),
            }),
            None => None,
        };

        Ok(SessionHeaders {
            auth_token: self.token.clone(),
            project_id: self.project_id.clone(),
            user_id: self.user_id.clone(),
            target,
        })
    }
}

/// Closed set of authentication backends
#[derive(Debug, Clone)]
pub enum AuthBackend {
    Keystone(KeystoneAuth),
    Keycloak(KeycloakAuth),
}

impl AuthBackend {
    /// Select a backend by key
    pub fn from_type(auth_type: Option<&str>) -> Result<Self> {
        match auth_type.unwrap_or("keystone") {
            "" | "keystone" => Ok(AuthBackend::Keystone(KeystoneAuth)),
            "keycloak-oidc" | "keycloak" | "oidc" => Ok(AuthBackend::Keycloak(KeycloakAuth)),
            other => Err(Error::Configuration(format!(
                "Unknown auth type '{}', expected 'keystone' or 'keycloak-oidc'",
                other
            ))),
        }
    }

    pub async fn authenticate(&self, request: &AuthRequest) -> Result<AuthResult> {
        match self {
            AuthBackend::Keystone(backend) => backend.authenticate(request).await,
            AuthBackend::Keycloak(backend) => backend.authenticate(request).await,
        }
    }
}

/// Negotiate the primary session and, when configured, the target session.
///
/// Parameter validation runs for both credential sets before any network
/// call is attempted.
pub async fn negotiate(request: &AuthRequest) -> Result<AuthResult> {
    request.credentials.validate()?;
    let target_credentials = request
        .target
        .as_ref()
        .filter(|t| present(&t.auth_url).is_some());
    if let Some(target) = target_credentials {
        target.validate()?;
    }

    let backend = AuthBackend::from_type(request.auth_type.as_deref())?;
    let mut result = backend.authenticate(request).await?;

    if let Some(target) = target_credentials {
        result.target = Some(keystone::authenticate_target(target).await?);
    }

    if result.is_authenticated() {
        tracing::info!(
            "Authenticated (project: {:?}, endpoint: {:?})",
            result.project_id,
            result.mistral_url
        );
    } else {
        tracing::debug!("No usable credentials, continuing without a session");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_name_and_id_conflict() {
        let creds = Credentials {
            project_name: Some("admin".into()),
            project_id: Some("abc".into()),
            ..Default::default()
        };
        assert!(matches!(creds.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_username_and_user_id_conflict() {
        let creds = Credentials {
            username: Some("admin".into()),
            user_id: Some("abc".into()),
            ..Default::default()
        };
        assert!(matches!(creds.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_empty_strings_do_not_conflict() {
        let creds = Credentials {
            project_name: Some("admin".into()),
            project_id: Some(String::new()),
            ..Default::default()
        };
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_usable_credentials() {
        assert!(!Credentials::default().is_usable());
        assert!(Credentials {
            token: Some("t".into()),
            ..Default::default()
        }
        .is_usable());
        assert!(Credentials {
            user_id: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        }
        .is_usable());
        assert!(!Credentials {
            password: Some("p".into()),
            ..Default::default()
        }
        .is_usable());
    }

    #[test]
    fn test_backend_selection() {
        assert!(matches!(AuthBackend::from_type(None), Ok(AuthBackend::Keystone(_))));
        assert!(matches!(
            AuthBackend::from_type(Some("keycloak-oidc")),
            Ok(AuthBackend::Keycloak(_))
        ));
        assert!(matches!(
            AuthBackend::from_type(Some("saml")),
            Err(Error::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_degraded_negotiation_returns_empty_result() {
        let request = AuthRequest {
            credentials: Credentials {
                auth_url: Some("http://127.0.0.1:9/v3".into()),
                username: Some("admin".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let result = negotiate(&request).await.expect("degraded mode never fails");
        assert!(!result.is_authenticated());
        assert!(result.mistral_url.is_none());
        assert!(result.target.is_none());
    }

    #[test]
    fn test_session_headers_from_result() {
        let result = AuthResult {
            token: Some("tok".into()),
            project_id: Some("proj".into()),
            user_id: Some("user".into()),
            target: Some(TargetAuth {
                auth_url: "http://target/v3".into(),
                token: "target-tok".into(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let headers = result.session_headers().unwrap();
        assert_eq!(headers.auth_token.as_deref(), Some("tok"));
        let target = headers.target.unwrap();
        assert_eq!(target.auth_token.as_deref(), Some("target-tok"));
        assert_eq!(target.service_catalog.as_deref(), Some("[]"));
    }
}
