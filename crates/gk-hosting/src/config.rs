//! Client configuration
//!
//! Credentials are always passed in explicitly; nothing here reads the
//! environment.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{Credentials, SecretToken};
use crate::error::{HostingError, HostingResult};

pub const DEFAULT_OFFICIAL_USER: &str = "project-alice-assistant";
pub const DEFAULT_WEB_BASE: &str = "https://github.com";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

fn default_official_user() -> String {
    DEFAULT_OFFICIAL_USER.to_string()
}

fn default_web_base() -> String {
    DEFAULT_WEB_BASE.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

/// Body of a create-repository request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRepositoryOptions {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "enabled")]
    pub has_issues: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
}

fn enabled() -> bool {
    true
}

impl CreateRepositoryOptions {
    /// Minimal request: name, description and issues enabled.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            has_issues: true,
            private: None,
            homepage: None,
        }
    }
}

/// URL layout of the hosting platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    web_base: String,
    api_base: String,
}

impl Endpoints {
    pub fn new(web_base: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            web_base: web_base.into().trim_end_matches('/').to_string(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn profile_url(&self, user: &str) -> String {
        format!("{}/{}", self.web_base, user)
    }

    pub fn repository_url(&self, owner: &str, repository: &str) -> String {
        format!("{}/{}/{}.git", self.web_base, owner, repository)
    }

    pub fn create_url(&self) -> String {
        format!("{}/user/repos", self.api_base)
    }

    pub fn fork_url(&self, owner: &str, repository: &str) -> String {
        format!("{}/repos/{}/{}/forks", self.api_base, owner, repository)
    }

    /// Host of the web base, used to find owners in repository URLs.
    pub fn domain(&self) -> String {
        url::Url::parse(&self.web_base)
            .ok()
            .and_then(|url| {
                let host = url.host_str()?.to_string();
                Some(match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host,
                })
            })
            .unwrap_or_else(|| self.web_base.clone())
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_WEB_BASE, DEFAULT_API_BASE)
    }
}

/// Everything a [`crate::HostingClient`] needs to resolve a repository
#[derive(Debug, Clone, Deserialize)]
pub struct HostingConfig {
    /// Acting user
    pub username: String,
    pub token: SecretToken,
    /// Repository name, shared by the user's and the official repository
    pub repository: String,
    /// Owner of the official upstream repository
    #[serde(default = "default_official_user")]
    pub official_user: String,
    /// Base URL of profile and repository pages
    #[serde(default = "default_web_base")]
    pub web_base: String,
    /// Base URL of the REST API
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Create or fork the user's repository when it is missing
    #[serde(default)]
    pub create_repository: bool,
    /// Body used when a repository has to be created
    #[serde(default)]
    pub create_options: Option<CreateRepositoryOptions>,
    /// Per-request timeout; requests block without limit when absent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl HostingConfig {
    pub fn new(
        username: impl Into<String>,
        token: impl Into<String>,
        repository: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            token: SecretToken::new(token),
            repository: repository.into(),
            official_user: default_official_user(),
            web_base: default_web_base(),
            api_base: default_api_base(),
            create_repository: false,
            create_options: None,
            timeout_secs: None,
        }
    }

    pub fn from_json(json: &str) -> HostingResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_official_user(mut self, user: impl Into<String>) -> Self {
        self.official_user = user.into();
        self
    }

    pub fn with_web_base(mut self, base: impl Into<String>) -> Self {
        self.web_base = base.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn create_repository(mut self, create: bool) -> Self {
        self.create_repository = create;
        self
    }

    pub fn with_create_options(mut self, options: CreateRepositoryOptions) -> Self {
        self.create_options = Some(options);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::new(&self.web_base, &self.api_base)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, self.token.clone())
    }

    pub(crate) fn validate(&self) -> HostingResult<()> {
        if self.username.trim().is_empty() || self.token.is_empty() || self.repository.trim().is_empty() {
            return Err(HostingError::MissingCredentials);
        }
        Ok(())
    }
}
