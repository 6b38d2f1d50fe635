//! Resource abstraction layer
//!
//! Every remote object type (workflows, executions, triggers, ...) shares one
//! CRUD protocol implemented by [`ResourceManager`]. Each submodule defines
//! the typed entity and a thin manager that builds URLs and request bodies.
//!
//! # Architecture
//!
//! - [`base`] - entity trait, CRUD manager, error translation
//! - [`query`] - list parameters and query string encoding
//! - one module per resource type
//!
//! # Example
//!
//! ```ignore
//! use mistralclient::resource::ListParams;
//!
//! async fn running(client: &mistralclient::MistralClient) -> mistralclient::Result<usize> {
//!     let params = ListParams::new().filter("state", "RUNNING").limit(100);
//!     Ok(client.executions().list(None, &params).await?.len())
//! }
//! ```

mod base;
mod query;

pub mod action_executions;
pub mod actions;
pub mod code_sources;
pub mod cron_triggers;
pub mod dynamic_actions;
pub mod environments;
pub mod event_triggers;
pub mod executions;
pub mod members;
pub mod services;
pub mod tasks;
pub mod workbooks;
pub mod workflows;

#[cfg(test)]
pub(crate) mod testing;

pub use base::{
    defaults_table, encode_json_argument, filter_matching, is_uuid_like, translate_error, Payload,
    Resource, ResourceManager, SERVER_ERROR_MESSAGE_HEADER,
};
pub use query::{append_query, build_query, with_namespace, ListParams};
