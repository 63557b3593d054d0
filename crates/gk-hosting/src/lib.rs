//! Hosting-platform client.
//!
//! [`HostingClient`] checks that the acting user and the official user
//! exist, finds the user's and the official repository, and creates or forks
//! the user's repository when asked to. All HTTP goes through an
//! [`HttpTransport`]; [`UreqTransport`] is the blocking default.

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod remote;
pub mod resolution;
pub mod transport;

pub use auth::{Credentials, SecretToken};
pub use client::{HostingClient, OFFICIAL_REMOTE_NAME, USER_REMOTE_NAME};
pub use config::{
    CreateRepositoryOptions, Endpoints, HostingConfig, DEFAULT_API_BASE, DEFAULT_OFFICIAL_USER,
    DEFAULT_WEB_BASE,
};
pub use error::{HostingError, HostingResult};
pub use remote::HostedRemote;
pub use resolution::{resolve, RemoteState, Resolution};
pub use transport::{HttpTransport, UreqTransport};
