//! Decides what to do given which repositories exist on the host.

/// Which of the user's and the official repository exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    NoRemotes,
    UserOnly,
    OfficialOnly,
    Both,
}

impl RemoteState {
    pub fn from_presence(user: bool, official: bool) -> Self {
        match (user, official) {
            (false, false) => RemoteState::NoRemotes,
            (true, false) => RemoteState::UserOnly,
            (false, true) => RemoteState::OfficialOnly,
            (true, true) => RemoteState::Both,
        }
    }

    pub fn has_user(self) -> bool {
        matches!(self, RemoteState::UserOnly | RemoteState::Both)
    }

    pub fn has_official(self) -> bool {
        matches!(self, RemoteState::OfficialOnly | RemoteState::Both)
    }
}

/// Action taken during client construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Use whatever exists
    Reuse,
    /// Create the repository under the acting user
    CreateRepository,
    /// Fork the official repository into the acting user's account
    ForkOfficial,
    /// Nothing exists and creation was not requested
    NotFound,
}

/// Resolution table for `state`. Existing user repositories are always
/// reused, even when creation was requested.
pub fn resolve(state: RemoteState, create_requested: bool) -> Resolution {
    match (state, create_requested) {
        (RemoteState::NoRemotes, true) => Resolution::CreateRepository,
        (RemoteState::NoRemotes, false) => Resolution::NotFound,
        (RemoteState::OfficialOnly, true) => Resolution::ForkOfficial,
        (RemoteState::OfficialOnly, false) => Resolution::Reuse,
        (RemoteState::UserOnly | RemoteState::Both, _) => Resolution::Reuse,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_presence() {
        assert_eq!(RemoteState::from_presence(false, false), RemoteState::NoRemotes);
        assert_eq!(RemoteState::from_presence(true, false), RemoteState::UserOnly);
        assert_eq!(RemoteState::from_presence(false, true), RemoteState::OfficialOnly);
        assert_eq!(RemoteState::from_presence(true, true), RemoteState::Both);
        assert!(RemoteState::Both.has_user() && RemoteState::Both.has_official());
        assert!(!RemoteState::OfficialOnly.has_user());
    }

    #[test]
    fn test_resolution_table() {
        assert_eq!(resolve(RemoteState::NoRemotes, true), Resolution::CreateRepository);
        assert_eq!(resolve(RemoteState::NoRemotes, false), Resolution::NotFound);
        assert_eq!(resolve(RemoteState::OfficialOnly, true), Resolution::ForkOfficial);
        assert_eq!(resolve(RemoteState::OfficialOnly, false), Resolution::Reuse);
        for create in [true, false] {
            assert_eq!(resolve(RemoteState::UserOnly, create), Resolution::Reuse);
            assert_eq!(resolve(RemoteState::Both, create), Resolution::Reuse);
        }
    }
}
