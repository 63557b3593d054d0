//! Blocking HTTP transport
//!
//! Only status codes matter to the client, so the transport reports the
//! status of every completed exchange and errors only when no response
//! was received at all.

use std::time::Duration;

use tracing::debug;

use crate::auth::Credentials;
use crate::error::{HostingError, HostingResult};

const USER_AGENT: &str = concat!("gk-hosting/", env!("CARGO_PKG_VERSION"));

/// Minimal HTTP surface used by the hosting client
pub trait HttpTransport: Send + Sync {
    /// GET `url`, optionally authenticated, and return the status code.
    fn get(&self, url: &str, credentials: Option<&Credentials>) -> HostingResult<u16>;

    /// Authenticated POST to `url` with an optional JSON body.
    fn post(
        &self,
        url: &str,
        credentials: &Credentials,
        body: Option<&serde_json::Value>,
    ) -> HostingResult<u16>;
}

/// [`HttpTransport`] backed by a `ureq` agent
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Without a timeout requests block until the server answers.
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(USER_AGENT);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(None)
    }
}

fn status_of(result: Result<ureq::Response, ureq::Error>) -> HostingResult<u16> {
    match result {
        Ok(response) => Ok(response.status()),
        Err(ureq::Error::Status(code, _)) => Ok(code),
        Err(ureq::Error::Transport(err)) => Err(HostingError::Transport(err.to_string())),
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, credentials: Option<&Credentials>) -> HostingResult<u16> {
        let mut request = self.agent.get(url);
        if let Some(credentials) = credentials {
            request = request.set("Authorization", &credentials.basic_auth_header());
        }
        let status = status_of(request.call())?;
        debug!(url, status, authenticated = credentials.is_some(), "GET");
        Ok(status)
    }

    fn post(
        &self,
        url: &str,
        credentials: &Credentials,
        body: Option<&serde_json::Value>,
    ) -> HostingResult<u16> {
        let request = self
            .agent
            .post(url)
            .set("Authorization", &credentials.basic_auth_header());
        let result = match body {
            Some(body) => request.send_json(body),
            None => request.call(),
        };
        let status = status_of(result)?;
        debug!(url, status, user = credentials.username(), "POST");
        Ok(status)
    }
}
