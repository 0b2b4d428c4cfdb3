use std::path::PathBuf;

use crate::error::{Error, Result};

/// Credential material scoped to a single template engine invocation.
///
/// The scope is an explicit value handed to each engine call rather than a
/// process-wide override, so concurrent operations with different
/// credentials cannot race on shared dispatch state. Nothing in the process
/// environment is touched; dropping a scope has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialScope {
    /// No credential; the transport uses whatever ambient configuration
    /// the version-control client has (public repositories, agents).
    Anonymous,
    /// HTTPS auth token, delivered non-interactively.
    Token(String),
    /// Forced identity file for SSH transport. Always absolute.
    SshKey(PathBuf),
}

impl CredentialScope {
    /// Validate and build a scope from at most one credential kind.
    ///
    /// Fails with [`Error::MutualExclusion`] when both a token and an SSH
    /// key path are supplied, and with [`Error::RelativeKeyPath`] when the
    /// key path is not absolute. Empty values count as absent, preserving
    /// the warn-and-proceed behavior for missing credentials.
    pub fn new(token: Option<String>, ssh_key_path: Option<PathBuf>) -> Result<Self> {
        let token = token.filter(|t| !t.trim().is_empty());
        let ssh_key_path = ssh_key_path.filter(|p| !p.as_os_str().is_empty());

        match (token, ssh_key_path) {
            (Some(_), Some(_)) => Err(Error::MutualExclusion),
            (Some(token), None) => Ok(CredentialScope::Token(token)),
            (None, Some(path)) => {
                if !path.is_absolute() {
                    return Err(Error::RelativeKeyPath(path));
                }
                Ok(CredentialScope::SshKey(path))
            }
            (None, None) => Ok(CredentialScope::Anonymous),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, CredentialScope::Anonymous)
    }

    /// Remote callbacks that answer the version-control client's credential
    /// queries from this scope. Terminal prompting never happens; an
    /// unanswered query fails the fetch instead.
    pub fn remote_callbacks(&self) -> git2::RemoteCallbacks<'static> {
        let scope = self.clone();
        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, _allowed| {
            let username = username_from_url.unwrap_or("git");
            match &scope {
                CredentialScope::Token(token) => {
                    git2::Cred::userpass_plaintext(username, token)
                }
                CredentialScope::SshKey(path) => {
                    git2::Cred::ssh_key(username, None, path, None)
                }
                CredentialScope::Anonymous => git2::Cred::default(),
            }
        });
        callbacks
    }

    /// Fetch options carrying this scope's callbacks.
    pub fn fetch_options(&self) -> git2::FetchOptions<'static> {
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(self.remote_callbacks());
        options
    }
}
