use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::credentials::CredentialScope;
use crate::engine::TemplateEngine;
use crate::error::{Error, Result};
use crate::registry::{AuthType, ProductDetails};
use crate::ui;
use crate::vault::CredentialVault;
use crate::workspace::{Workspace, ANSWERS_FILE, SHARED_DIRS};

/// A registered product bound to its workspace.
///
/// Lifecycle: Registered -> Installed -> Updated (self-loop). `install`
/// materializes a fresh checkout and finalizes shared-directory links;
/// `update` re-applies from the recorded answers file and leaves links
/// alone.
#[derive(Debug)]
pub struct Product {
    details: ProductDetails,
    workspace: Workspace,
}

impl Product {
    pub fn new(details: ProductDetails, workspace: Workspace) -> Self {
        Self { details, workspace }
    }

    pub fn id(&self) -> &str {
        &self.details.id
    }

    pub fn details(&self) -> &ProductDetails {
        &self.details
    }

    /// Absolute destination of the materialized product.
    pub fn dst_path(&self) -> PathBuf {
        self.workspace.resolve(&self.details.dst_path)
    }

    /// Resolve credentials for this product's auth type: inline registry
    /// value if present, else the vault.
    ///
    /// When neither source has a value the operation warns and proceeds
    /// with an anonymous scope, so a public repository registered with a
    /// stale auth type still installs.
    pub fn credential_scope(&self, vault: &CredentialVault) -> Result<CredentialScope> {
        match self.details.vcs_auth_type {
            AuthType::Skip => Ok(CredentialScope::Anonymous),
            AuthType::Token => {
                let token = match self.details.vcs_auth_token.clone() {
                    Some(token) => Some(token),
                    None => self.vault_secret(vault)?,
                };
                if token.is_none() {
                    ui::warn(format!(
                        "auth token for '{}' neither inline nor in the vault; proceeding unauthenticated",
                        self.id()
                    ));
                }
                CredentialScope::new(token, None)
            }
            AuthType::SshKey => {
                let raw = match self.details.vcs_auth_sshkeypath.clone() {
                    Some(path) => Some(path),
                    None => self.vault_secret(vault)?,
                };
                if raw.is_none() {
                    ui::warn(format!(
                        "SSH key path for '{}' neither inline nor in the vault; proceeding unauthenticated",
                        self.id()
                    ));
                }
                let path = raw.map(|p| PathBuf::from(shellexpand::tilde(&p).into_owned()));
                CredentialScope::new(None, path)
            }
        }
    }

    /// Look the product's secret up in the vault. Absence is fine (the
    /// caller falls back to an anonymous scope); any other failure, such as
    /// an unreadable secret file, propagates.
    fn vault_secret(&self, vault: &CredentialVault) -> Result<Option<String>> {
        match vault.load(self.id()) {
            Ok(value) => Ok(Some(value)),
            Err(Error::CredentialMissing(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Materialize the product at its recorded ref and link shared
    /// directories into the workspace.
    pub fn install(&self, engine: &dyn TemplateEngine, vault: &CredentialVault) -> Result<()> {
        let scope = self.credential_scope(vault)?;

        engine
            .copy(
                &self.details.vcs_repo,
                &self.dst_path(),
                &self.details.vcs_ref,
                Path::new(ANSWERS_FILE),
                &scope,
            )
            .map_err(|source| Error::TemplateEngine {
                op: "install",
                id: self.id().to_string(),
                source,
            })?;

        self.create_symlinks()
    }

    /// Re-apply the product from its answers file. Does not touch links.
    pub fn update(&self, engine: &dyn TemplateEngine, vault: &CredentialVault) -> Result<()> {
        let scope = self.credential_scope(vault)?;

        engine
            .update(&self.dst_path(), Path::new(ANSWERS_FILE), &scope)
            .map_err(|source| Error::TemplateEngine {
                op: "update",
                id: self.id().to_string(),
                source,
            })
    }

    /// Link each shared subdirectory that exists inside the product into
    /// the matching workspace-level directory, named by product id.
    ///
    /// Existing links count as success; shared directories the product does
    /// not ship are skipped silently.
    fn create_symlinks(&self) -> Result<()> {
        let dst = self.dst_path();

        for part in SHARED_DIRS {
            let target = dst.join(part);
            if !target.exists() {
                tracing::debug!("product '{}' has no {part}/, skipping link", self.id());
                continue;
            }

            let link_parent = self.workspace.resolve(part);
            fs::create_dir_all(&link_parent).map_err(|e| {
                Error::io(format!("failed to create directory {:?}", link_parent), e)
            })?;

            let link = link_parent.join(self.id());
            match symlink_dir(&target, &link) {
                Ok(()) => tracing::debug!("linked {:?} -> {:?}", link, target),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!("link {:?} already exists", link);
                }
                Err(e) => {
                    return Err(Error::io(
                        format!("failed to link {:?} -> {:?}", link, target),
                        e,
                    ))
                }
            }
        }

        Ok(())
    }
}

#[cfg(unix)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_dir(target: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(target, link)
}
