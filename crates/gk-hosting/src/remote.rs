//! Repositories hosted on the platform, addressed over HTTP.

use std::fmt;
use std::sync::Arc;

use gk_repo::{parse, RemoteLink};
use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::config::Endpoints;
use crate::error::{HostingError, HostingResult};
use crate::transport::HttpTransport;

const STATUS_ACCEPTED: u16 = 202;
const STATUS_NOT_FOUND: u16 = 404;
const STATUS_RATE_LIMITED: u16 = 429;

/// A [`RemoteLink`] to a hosted repository together with the credentials
/// of the acting user, so it can be forked.
#[derive(Clone)]
pub struct HostedRemote {
    link: RemoteLink,
    owner: String,
    repository: String,
    credentials: Credentials,
    endpoints: Endpoints,
    transport: Arc<dyn HttpTransport>,
}

impl fmt::Debug for HostedRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostedRemote")
            .field("link", &self.link)
            .field("owner", &self.owner)
            .field("repository", &self.repository)
            .field("acting_user", &self.credentials.username())
            .finish()
    }
}

impl HostedRemote {
    /// Owner and repository name are taken from `url`.
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        credentials: Credentials,
        endpoints: Endpoints,
        transport: Arc<dyn HttpTransport>,
    ) -> HostingResult<Self> {
        let url = url.into();
        let (owner, repository) = parse::repository_slug(&url)
            .ok_or_else(|| HostingError::InvalidRemoteUrl(url.clone()))?;
        let link = RemoteLink::with_domain(name, url, &endpoints.domain())?.with_user(owner.as_str());
        Ok(Self {
            link,
            owner,
            repository,
            credentials,
            endpoints,
            transport,
        })
    }

    pub fn link(&self) -> &RemoteLink {
        &self.link
    }

    pub fn name(&self) -> &str {
        self.link.name()
    }

    pub fn url(&self) -> &str {
        self.link.url()
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Fork this repository into the acting user's account.
    ///
    /// Refuses without any request when the acting user owns the
    /// repository, and without a fork request when a repository of the same
    /// name already exists under the acting user.
    pub fn fork(&self) -> HostingResult<HostedRemote> {
        let acting_user = self.credentials.username();
        if self.owner.eq_ignore_ascii_case(acting_user) {
            return Err(HostingError::CannotForkOwn(self.repository.clone()));
        }

        let fork_url = self.endpoints.repository_url(acting_user, &self.repository);
        let status = self.transport.get(&fork_url, None)?;
        if status != STATUS_NOT_FOUND {
            debug!(url = %fork_url, status, "fork target already exists");
            return Err(HostingError::AlreadyForked(self.repository.clone()));
        }

        let status = self.transport.post(
            &self.endpoints.fork_url(&self.owner, &self.repository),
            &self.credentials,
            None,
        )?;
        match status {
            STATUS_RATE_LIMITED => Err(HostingError::RateLimit(acting_user.to_string())),
            STATUS_ACCEPTED => {
                info!(owner = %self.owner, repository = %self.repository, user = acting_user, "forked repository");
                HostedRemote::new(
                    self.link.name(),
                    fork_url,
                    self.credentials.clone(),
                    self.endpoints.clone(),
                    Arc::clone(&self.transport),
                )
            }
            status => {
                warn!(repository = %self.repository, status, "fork request rejected");
                Err(HostingError::ForkFailed(self.repository.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SecretToken;

    struct Unreachable;

    impl HttpTransport for Unreachable {
        fn get(&self, url: &str, _: Option<&Credentials>) -> HostingResult<u16> {
            Err(HostingError::Transport(format!("unexpected GET {}", url)))
        }

        fn post(&self, url: &str, _: &Credentials, _: Option<&serde_json::Value>) -> HostingResult<u16> {
            Err(HostingError::Transport(format!("unexpected POST {}", url)))
        }
    }

    fn remote(url: &str, user: &str) -> HostingResult<HostedRemote> {
        HostedRemote::new(
            "origin",
            url,
            Credentials::new(user, SecretToken::new("secret")),
            Endpoints::default(),
            Arc::new(Unreachable),
        )
    }

    #[test]
    fn test_slug_and_owner_from_url() {
        let remote = remote("https://github.com/org/skill_weather.git", "alice").unwrap();
        assert_eq!(remote.owner(), "org");
        assert_eq!(remote.repository(), "skill_weather");
        assert_eq!(remote.link().user(), Some("org"));
        assert!(!format!("{:?}", remote).contains("secret"));
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(matches!(
            remote("https://github.com/", "alice"),
            Err(HostingError::InvalidRemoteUrl(_))
        ));
    }

    #[test]
    fn test_fork_own_repository_makes_no_request() {
        let remote = remote("https://github.com/Alice/skill.git", "alice").unwrap();
        assert!(matches!(remote.fork(), Err(HostingError::CannotForkOwn(name)) if name == "skill"));
    }
}
