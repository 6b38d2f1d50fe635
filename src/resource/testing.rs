//! Recording transport for unit tests

use crate::error::{Error, Result};
use crate::mistral::http::{Response, Transport};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Serves queued responses in order and records every call
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Response>>,
    calls: Mutex<Vec<RecordedCall>>,
    project_id: Option<String>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_project(project_id: &str) -> Arc<Self> {
        Arc::new(Self {
            project_id: Some(project_id.to_string()),
            ..Default::default()
        })
    }

    pub fn respond(&self, status: u16, body: &str) {
        self.push(Response::new(status, body));
    }

    pub fn push(&self, response: Response) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        body: Option<String>,
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            path: path.to_string(),
            body,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| {
                Error::Configuration(format!("no response queued for {} {}", method, path))
            })
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response> {
        self.record("GET", path, None, headers)
    }

    async fn post(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response> {
        self.record("POST", path, Some(body), headers)
    }

    async fn put(&self, path: &str, body: String, headers: &[(&str, &str)]) -> Result<Response> {
        self.record("PUT", path, Some(body), headers)
    }

    async fn delete(&self, path: &str, headers: &[(&str, &str)]) -> Result<Response> {
        self.record("DELETE", path, None, headers)
    }

    fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}
