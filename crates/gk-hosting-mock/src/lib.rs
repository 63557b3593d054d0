//! Mock HTTP transport backed by a URL to status script

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use gk_hosting::{Credentials, HostingResult, HttpTransport};

/// Unscripted URLs answer with this status.
pub const DEFAULT_STATUS: u16 = 404;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

/// One request seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    /// Username the request was authenticated as, if any
    pub user: Option<String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<(Method, String), u16>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(self, url: impl Into<String>, status: u16) -> Self {
        self.set(Method::Get, url, status);
        self
    }

    pub fn on_post(self, url: impl Into<String>, status: u16) -> Self {
        self.set(Method::Post, url, status);
        self
    }

    /// Change a scripted status after the transport has been shared.
    pub fn set(&self, method: Method, url: impl Into<String>, status: u16) {
        lock(&self.routes).insert((method, url.into()), status);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn posts(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.method == Method::Post)
            .collect()
    }

    fn respond(&self, request: RecordedRequest) -> u16 {
        let status = lock(&self.routes)
            .get(&(request.method, request.url.clone()))
            .copied()
            .unwrap_or(DEFAULT_STATUS);
        lock(&self.requests).push(request);
        status
    }
}

impl HttpTransport for MockTransport {
    fn get(&self, url: &str, credentials: Option<&Credentials>) -> HostingResult<u16> {
        Ok(self.respond(RecordedRequest {
            method: Method::Get,
            url: url.to_string(),
            user: credentials.map(|c| c.username().to_string()),
            body: None,
        }))
    }

    fn post(
        &self,
        url: &str,
        credentials: &Credentials,
        body: Option<&serde_json::Value>,
    ) -> HostingResult<u16> {
        Ok(self.respond(RecordedRequest {
            method: Method::Post,
            url: url.to_string(),
            user: Some(credentials.username().to_string()),
            body: body.cloned(),
        }))
    }
}
