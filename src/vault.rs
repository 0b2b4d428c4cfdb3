use std::fs;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::workspace::{Workspace, WorkspacePath};

/// Per-product secret storage.
///
/// One file per product under `config/secrets/`, holding either raw token
/// text or an absolute SSH key path. Kept outside the registry file so
/// `products.toml` can be committed to version control.
#[derive(Debug, Clone)]
pub struct CredentialVault {
    secrets_dir: PathBuf,
}

impl CredentialVault {
    pub fn new(workspace: &Workspace) -> Self {
        Self {
            secrets_dir: workspace.path(WorkspacePath::Secrets),
        }
    }

    /// Location of the secret file for a product.
    pub fn secret_path(&self, id: &str) -> PathBuf {
        self.secrets_dir.join(format!("vcs_auth_{id}"))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.secret_path(id).is_file()
    }

    /// Write secret material for a product, creating the secrets directory
    /// if needed. Owner-only permissions on unix.
    pub fn save(&self, id: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.secrets_dir).map_err(|e| {
            Error::io(
                format!("failed to create secrets directory {:?}", self.secrets_dir),
                e,
            )
        })?;

        let path = self.secret_path(id);
        fs::write(&path, value)
            .map_err(|e| Error::io(format!("failed to write secret {:?}", path), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))
                .map_err(|e| Error::io(format!("failed to restrict permissions on {:?}", path), e))?;
        }

        tracing::debug!("saved credential for '{id}' to {:?}", path);
        Ok(())
    }

    /// Read secret material for a product.
    pub fn load(&self, id: &str) -> Result<String> {
        let path = self.secret_path(id);
        if !path.is_file() {
            return Err(Error::CredentialMissing(id.to_string()));
        }

        let value = fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("failed to read secret {:?}", path), e))?;
        Ok(value.trim_end_matches(['\r', '\n']).to_string())
    }
}
