//! Mistral Client
//!
//! Entry point combining authentication, the HTTP transport and one manager
//! per resource type.

use super::auth::{negotiate, AuthRequest, AuthResult};
use super::http::{HttpTransport, TlsOptions, Transport};
use crate::error::Result;
use crate::resource::action_executions::ActionExecutionManager;
use crate::resource::actions::ActionManager;
use crate::resource::code_sources::CodeSourceManager;
use crate::resource::cron_triggers::CronTriggerManager;
use crate::resource::dynamic_actions::DynamicActionManager;
use crate::resource::environments::EnvironmentManager;
use crate::resource::event_triggers::EventTriggerManager;
use crate::resource::executions::ExecutionManager;
use crate::resource::members::MemberManager;
use crate::resource::services::ServiceManager;
use crate::resource::tasks::TaskManager;
use crate::resource::workbooks::WorkbookManager;
use crate::resource::workflows::WorkflowManager;
use crate::resource::ResourceManager;
use std::sync::Arc;

/// Endpoint used when neither the caller nor the service catalog names one
pub const DEFAULT_MISTRAL_URL: &str = "http://localhost:8989/v2";

/// Main Mistral client
#[derive(Clone)]
pub struct MistralClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    auth: AuthResult,
}

impl MistralClient {
    /// Authenticate, resolve the endpoint and build the transport.
    ///
    /// Missing credentials are not an error: the client is built without a
    /// token and requests go out unauthenticated.
    pub async fn new(request: &AuthRequest, tls: &TlsOptions) -> Result<Self> {
        let auth = negotiate(request).await?;

        let base_url = auth
            .mistral_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_MISTRAL_URL.to_string());
        tracing::debug!("Using Mistral endpoint {}", base_url);

        let transport = HttpTransport::new(&base_url, auth.session_headers()?, tls)?;

        Ok(Self {
            transport: Arc::new(transport),
            base_url,
            auth,
        })
    }

    /// Build a client over an existing transport, skipping authentication.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            base_url: String::new(),
            auth: AuthResult::default(),
        }
    }

    /// Resolved endpoint; empty for clients built with [`Self::with_transport`]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &AuthResult {
        &self.auth
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn manager<R: crate::resource::Resource>(&self) -> ResourceManager<R> {
        ResourceManager::new(Arc::clone(&self.transport))
    }

    pub fn workbooks(&self) -> WorkbookManager {
        WorkbookManager::new(self.manager())
    }

    pub fn workflows(&self) -> WorkflowManager {
        WorkflowManager::new(self.manager())
    }

    pub fn executions(&self) -> ExecutionManager {
        ExecutionManager::new(self.manager())
    }

    pub fn tasks(&self) -> TaskManager {
        TaskManager::new(self.manager())
    }

    pub fn actions(&self) -> ActionManager {
        ActionManager::new(self.manager())
    }

    pub fn action_executions(&self) -> ActionExecutionManager {
        ActionExecutionManager::new(self.manager())
    }

    pub fn cron_triggers(&self) -> CronTriggerManager {
        CronTriggerManager::new(self.manager())
    }

    pub fn event_triggers(&self) -> EventTriggerManager {
        EventTriggerManager::new(self.manager())
    }

    pub fn environments(&self) -> EnvironmentManager {
        EnvironmentManager::new(self.manager())
    }

    pub fn services(&self) -> ServiceManager {
        ServiceManager::new(self.manager())
    }

    pub fn members(&self) -> MemberManager {
        MemberManager::new(self.manager())
    }

    pub fn code_sources(&self) -> CodeSourceManager {
        CodeSourceManager::new(self.manager())
    }

    pub fn dynamic_actions(&self) -> DynamicActionManager {
        DynamicActionManager::new(self.manager())
    }
}
