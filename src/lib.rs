//! Client library for the Mistral workflow service REST API
//!
//! [`MistralClient`] authenticates against Keystone or Keycloak, resolves the
//! workflow endpoint and hands out one manager per resource type.
//!
//! ```ignore
//! use mistralclient::{AuthRequest, MistralClient, TlsOptions};
//!
//! async fn example() -> mistralclient::Result<()> {
//!     let client = MistralClient::new(&AuthRequest::default(), &TlsOptions::default()).await?;
//!     for wf in client.workflows().list("", &Default::default()).await? {
//!         println!("{}", wf);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod mistral;
pub mod resource;

pub use error::{ApiError, Error, Result};
pub use mistral::auth::{AuthRequest, AuthResult, Credentials, OidcParams};
pub use mistral::client::MistralClient;
pub use mistral::http::{HttpTransport, TlsOptions, Transport};
pub use resource::{ListParams, Resource};
