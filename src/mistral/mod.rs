//! Mistral API interaction module
//!
//! Authentication, endpoint discovery and the HTTP transport that the
//! resource managers sit on.
//!
//! # Module Structure
//!
//! - [`auth`] - Keystone and Keycloak authentication negotiation
//! - [`catalog`] - service catalog endpoint lookup
//! - [`client`] - main client handing out resource managers
//! - [`http`] - transport trait and reqwest implementation
//!
//! # Example
//!
//! ```ignore
//! use mistralclient::mistral::{auth::AuthRequest, client::MistralClient, http::TlsOptions};
//!
//! async fn example() -> mistralclient::Result<()> {
//!     let client = MistralClient::new(&AuthRequest::default(), &TlsOptions::default()).await?;
//!     let workflows = client.workflows().list("", &Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod catalog;
pub mod client;
pub mod http;
