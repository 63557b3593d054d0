//! Hosting-platform client bound to one user and one repository name.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::config::{CreateRepositoryOptions, Endpoints, HostingConfig};
use crate::error::{HostingError, HostingResult};
use crate::remote::HostedRemote;
use crate::resolution::{resolve, RemoteState, Resolution};
use crate::transport::{HttpTransport, UreqTransport};

/// Remote name given to the acting user's repository
pub const USER_REMOTE_NAME: &str = "origin";
/// Remote name given to the official repository
pub const OFFICIAL_REMOTE_NAME: &str = "upstream";

const STATUS_OK: u16 = 200;
const STATUS_RATE_LIMITED: u16 = 429;

/// Client that has resolved the user's and the official repository.
///
/// Construction fails unless at least one of them exists afterwards.
pub struct HostingClient {
    credentials: Credentials,
    repository: String,
    official_user: String,
    endpoints: Endpoints,
    transport: Arc<dyn HttpTransport>,
    user_remote: Option<HostedRemote>,
    official_remote: Option<HostedRemote>,
}

impl fmt::Debug for HostingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostingClient")
            .field("username", &self.credentials.username())
            .field("repository", &self.repository)
            .field("official_user", &self.official_user)
            .field("user_remote", &self.user_remote)
            .field("official_remote", &self.official_remote)
            .finish()
    }
}

impl HostingClient {
    /// Resolve repositories over HTTP using `ureq`.
    pub fn connect(config: HostingConfig) -> HostingResult<Self> {
        let transport = Arc::new(UreqTransport::new(config.timeout()));
        Self::with_transport(config, transport)
    }

    /// Resolve repositories through `transport`.
    ///
    /// 1. both the acting user and the official user must exist
    /// 2. the user's and the official repository are probed
    /// 3. a missing user repository is created or forked when requested
    /// 4. fails with [`HostingError::RepoNotFound`] when nothing is left
    pub fn with_transport(config: HostingConfig, transport: Arc<dyn HttpTransport>) -> HostingResult<Self> {
        config.validate()?;

        let mut client = Self {
            credentials: config.credentials(),
            repository: config.repository.clone(),
            official_user: config.official_user.clone(),
            endpoints: config.endpoints(),
            transport,
            user_remote: None,
            official_remote: None,
        };

        client.check_users()?;
        client.user_remote = client.find_remote(USER_REMOTE_NAME, &client.user_url())?;
        client.official_remote = client.find_remote(OFFICIAL_REMOTE_NAME, &client.official_url())?;

        let state = RemoteState::from_presence(client.user_remote.is_some(), client.official_remote.is_some());
        let resolution = resolve(state, config.create_repository);
        debug!(repository = %client.repository, ?state, ?resolution, "resolved remotes");

        match resolution {
            Resolution::Reuse => {}
            Resolution::CreateRepository => {
                let options = config
                    .create_options
                    .clone()
                    .unwrap_or_else(|| CreateRepositoryOptions::new(client.repository.as_str(), ""));
                let created = client.create_repository_with(options)?;
                client.user_remote = Some(created);
            }
            Resolution::ForkOfficial => {
                let forked = match &client.official_remote {
                    Some(official) => official.fork()?,
                    None => return Err(HostingError::RepoNotFound(client.repository.clone())),
                };
                client.user_remote = Some(forked);
            }
            Resolution::NotFound => return Err(HostingError::RepoNotFound(client.repository.clone())),
        }

        Ok(client)
    }

    /// Fail with [`HostingError::UserNotFound`] unless both users' profile
    /// pages answer 200.
    pub fn check_users(&self) -> HostingResult<()> {
        for user in [self.credentials.username(), self.official_user.as_str()] {
            let status = self.transport.get(&self.endpoints.profile_url(user), None)?;
            if status != STATUS_OK {
                warn!(user, status, "user not found");
                return Err(HostingError::UserNotFound(user.to_string()));
            }
        }
        Ok(())
    }

    /// True if `url` answers 200.
    pub fn probe(&self, url: &str) -> HostingResult<bool> {
        Ok(self.transport.get(url, None)? == STATUS_OK)
    }

    fn find_remote(&self, name: &str, url: &str) -> HostingResult<Option<HostedRemote>> {
        if !self.probe(url)? {
            debug!(url, "repository not found");
            return Ok(None);
        }
        self.hosted(name, url.to_string()).map(Some)
    }

    fn hosted(&self, name: &str, url: String) -> HostingResult<HostedRemote> {
        HostedRemote::new(
            name,
            url,
            self.credentials.clone(),
            self.endpoints.clone(),
            Arc::clone(&self.transport),
        )
    }

    /// Create a repository under the acting user. Without `options` the
    /// request carries only the name, the description and issues enabled.
    pub fn create_repository(
        &self,
        name: &str,
        description: &str,
        options: Option<CreateRepositoryOptions>,
    ) -> HostingResult<HostedRemote> {
        self.create_repository_with(options.unwrap_or_else(|| CreateRepositoryOptions::new(name, description)))
    }

    fn create_repository_with(&self, options: CreateRepositoryOptions) -> HostingResult<HostedRemote> {
        let body = serde_json::to_value(&options)?;
        let status = self
            .transport
            .post(&self.endpoints.create_url(), &self.credentials, Some(&body))?;

        match status {
            STATUS_RATE_LIMITED => Err(HostingError::RateLimit(self.credentials.username().to_string())),
            200..=299 => {
                info!(repository = %options.name, user = self.credentials.username(), "created repository");
                let url = self.endpoints.repository_url(self.credentials.username(), &options.name);
                self.hosted(USER_REMOTE_NAME, url)
            }
            status => Err(HostingError::CreateFailed {
                name: options.name,
                status,
            }),
        }
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn official_user(&self) -> &str {
        &self.official_user
    }

    /// URL of the acting user's repository
    pub fn user_url(&self) -> String {
        self.endpoints.repository_url(self.credentials.username(), &self.repository)
    }

    /// URL of the official repository
    pub fn official_url(&self) -> String {
        self.endpoints.repository_url(&self.official_user, &self.repository)
    }

    pub fn user_remote(&self) -> Option<&HostedRemote> {
        self.user_remote.as_ref()
    }

    pub fn official_remote(&self) -> Option<&HostedRemote> {
        self.official_remote.as_ref()
    }

    /// The repository to work against: the user's if it exists, else the
    /// official one.
    pub fn remote(&self) -> Option<&HostedRemote> {
        self.user_remote.as_ref().or(self.official_remote.as_ref())
    }

    /// The user's repository URL with credentials embedded, for pushing.
    /// Contains the token: never log it.
    pub fn authenticated_url(&self) -> HostingResult<String> {
        let user_url = self.user_url();
        let mut url = url::Url::parse(&user_url).map_err(|_| HostingError::InvalidRemoteUrl(user_url.clone()))?;
        url.set_username(self.credentials.username())
            .and_then(|()| url.set_password(Some(self.credentials.token().expose())))
            .map_err(|()| HostingError::InvalidRemoteUrl(user_url))?;
        Ok(url.to_string())
    }
}
