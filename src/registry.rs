use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::questions::{AnswerValue, Reconciled};
use crate::workspace::{Workspace, WorkspacePath};

/// How the version-control client authenticates for a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    Skip,
    Token,
    SshKey,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::Skip => write!(f, "skip"),
            AuthType::Token => write!(f, "token"),
            AuthType::SshKey => write!(f, "sshkey"),
        }
    }
}

impl AuthType {
    fn parse(raw: &str) -> Result<Self> {
        match raw {
            "skip" => Ok(AuthType::Skip),
            "token" => Ok(AuthType::Token),
            "sshkey" => Ok(AuthType::SshKey),
            other => Err(Error::validation(
                "vcs_auth_type",
                format!("'{other}' is not one of: skip, token, sshkey"),
            )),
        }
    }
}

/// A registered product entry as persisted in `config/products.toml`.
///
/// The inline secret fields exist only for hand-edited registries; `wpm add`
/// always externalizes secrets to the vault and never writes them here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDetails {
    pub id: String,
    pub vcs_repo: String,
    /// Destination relative to the workspace root.
    pub dst_path: PathBuf,
    #[serde(default = "default_ref")]
    pub vcs_ref: String,
    #[serde(default)]
    pub vcs_auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_auth_sshkeypath: Option<String>,
}

fn default_ref() -> String {
    "main".to_string()
}

/// Partially specified entry built from reconciled answers.
///
/// Upsert policy is merge: present fields overlay the existing entry,
/// absent fields keep their previous values. This tolerates a partial
/// re-ask that only touched some questions.
#[derive(Debug, Default, Clone)]
struct ProductOverlay {
    id: Option<String>,
    vcs_repo: Option<String>,
    dst_path: Option<PathBuf>,
    vcs_ref: Option<String>,
    vcs_auth_type: Option<AuthType>,
}

impl ProductOverlay {
    fn from_answers(
        answers: &std::collections::BTreeMap<String, AnswerValue>,
        workspace: &Workspace,
    ) -> Result<Self> {
        let mut overlay = Self::default();

        for (name, value) in answers {
            match name.as_str() {
                "id" => overlay.id = Some(value.to_string()),
                "vcs_repo" => overlay.vcs_repo = Some(value.to_string()),
                "dst_path" => {
                    let path = match value {
                        AnswerValue::Path(path) => path.clone(),
                        other => PathBuf::from(other.to_string()),
                    };
                    overlay.dst_path = Some(workspace.relativize(&path)?);
                }
                "vcs_ref" => overlay.vcs_ref = Some(value.to_string()),
                "vcs_auth_type" => {
                    overlay.vcs_auth_type = Some(AuthType::parse(&value.to_string())?)
                }
                other => {
                    tracing::debug!("ignoring answer '{other}' with no registry field");
                }
            }
        }

        Ok(overlay)
    }

    fn apply_to(&self, entry: &mut ProductDetails) {
        if let Some(vcs_repo) = &self.vcs_repo {
            entry.vcs_repo = vcs_repo.clone();
        }
        if let Some(dst_path) = &self.dst_path {
            entry.dst_path = dst_path.clone();
        }
        if let Some(vcs_ref) = &self.vcs_ref {
            entry.vcs_ref = vcs_ref.clone();
        }
        if let Some(vcs_auth_type) = self.vcs_auth_type {
            entry.vcs_auth_type = vcs_auth_type;
        }
    }

    fn into_details(self) -> Result<ProductDetails> {
        let id = self
            .id
            .ok_or_else(|| Error::validation("id", "missing required answer"))?;
        let vcs_repo = self
            .vcs_repo
            .ok_or_else(|| Error::validation("vcs_repo", "missing required answer"))?;
        let dst_path = self
            .dst_path
            .ok_or_else(|| Error::validation("dst_path", "missing required answer"))?;

        Ok(ProductDetails {
            id,
            vcs_repo,
            dst_path,
            vcs_ref: self.vcs_ref.unwrap_or_else(default_ref),
            vcs_auth_type: self.vcs_auth_type.unwrap_or_default(),
            vcs_auth_token: None,
            vcs_auth_sshkeypath: None,
        })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    products: Vec<ProductDetails>,
}

/// The ordered collection of product entries.
#[derive(Debug)]
pub struct ProductRegistry {
    path: PathBuf,
    file: RegistryFile,
    workspace: Workspace,
}

impl ProductRegistry {
    /// Load the registry from `config/products.toml`.
    ///
    /// A missing file is [`Error::NotFound`]; a file without a `products`
    /// collection (or with invalid entries) is [`Error::MalformedConfig`].
    pub fn load(workspace: &Workspace) -> Result<Self> {
        let path = workspace.path(WorkspacePath::Registry);
        if !path.is_file() {
            return Err(Error::NotFound(path));
        }

        let contents = fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("failed to read registry {:?}", path), e))?;

        let value: toml::Value = toml::from_str(&contents).map_err(|e| Error::MalformedConfig {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if value.get("products").is_none() {
            return Err(Error::MalformedConfig {
                path,
                reason: "missing 'products' collection".to_string(),
            });
        }

        let file: RegistryFile =
            toml::from_str(&contents).map_err(|e| Error::MalformedConfig {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        // Ids must be unique; lookups and upserts address entries by id.
        let mut seen = std::collections::BTreeSet::new();
        for product in &file.products {
            if !seen.insert(product.id.as_str()) {
                return Err(Error::MalformedConfig {
                    path,
                    reason: format!("duplicate product id '{}'", product.id),
                });
            }
        }

        Ok(Self {
            path,
            file,
            workspace: workspace.clone(),
        })
    }

    /// Serialize the full collection back to storage, preserving entry order.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("failed to create directory {:?}", parent), e))?;
        }

        let contents = toml::to_string_pretty(&self.file).map_err(|e| Error::MalformedConfig {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&self.path, contents)
            .map_err(|e| Error::io(format!("failed to write registry {:?}", self.path), e))
    }

    pub fn list(&self) -> &[ProductDetails] {
        &self.file.products
    }

    pub fn ids(&self) -> Vec<String> {
        self.file.products.iter().map(|p| p.id.clone()).collect()
    }

    pub fn get(&self, id: &str) -> Option<&ProductDetails> {
        self.file.products.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert or update an entry from reconciled answers, returning the
    /// product id. Only `answers_to_remember` reach the registry; secret
    /// values are the caller's responsibility to route to the vault.
    pub fn upsert(&mut self, reconciled: &Reconciled) -> Result<String> {
        let overlay = ProductOverlay::from_answers(&reconciled.answers_to_remember(), &self.workspace)?;
        let id = overlay
            .id
            .clone()
            .ok_or_else(|| Error::validation("id", "missing required answer"))?;

        match self.file.products.iter_mut().find(|p| p.id == id) {
            Some(existing) => overlay.apply_to(existing),
            None => self.file.products.push(overlay.into_details()?),
        }

        Ok(id)
    }

    pub fn registry_path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::Prompt;
    use crate::questions::{product_questions, reconcile, QuestionSpec};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    struct NoPrompt;

    impl Prompt for NoPrompt {
        fn ask(&self, question: &QuestionSpec) -> Result<String> {
            Err(Error::validation(&question.name, "prompting disabled"))
        }

        fn confirm(&self, _message: &str, default: bool) -> Result<bool> {
            Ok(default)
        }

        fn select(&self, message: &str, _options: &[String]) -> Result<String> {
            Err(Error::validation(message, "prompting disabled"))
        }
    }

    fn workspace_with_registry(contents: &str) -> (TempDir, Workspace) {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::at(temp.path());
        let path = workspace.path(WorkspacePath::Registry);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        (temp, workspace)
    }

    fn reconciled_for(repo: &str, extra: &[(&str, &str)]) -> Reconciled {
        let mut provided = BTreeMap::new();
        for (name, value) in extra {
            provided.insert(name.to_string(), value.to_string());
        }
        reconcile(&product_questions(Some(repo)), &provided, true, &NoPrompt).unwrap()
    }

    #[test]
    fn load_missing_registry_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = ProductRegistry::load(&Workspace::at(temp.path())).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn load_without_products_collection_is_malformed() {
        let (_temp, workspace) = workspace_with_registry("version = 1\n");
        let err = ProductRegistry::load(&workspace).unwrap_err();
        assert!(
            matches!(err, Error::MalformedConfig { ref reason, .. } if reason.contains("products"))
        );
    }

    #[test]
    fn load_empty_products_is_valid() {
        let (_temp, workspace) = workspace_with_registry("products = []\n");
        let registry = ProductRegistry::load(&workspace).unwrap();
        assert!(registry.list().is_empty());
    }

    #[test]
    fn load_rejects_entries_missing_required_fields() {
        let (_temp, workspace) =
            workspace_with_registry("[[products]]\nid = \"dangling\"\n");
        let err = ProductRegistry::load(&workspace).unwrap_err();
        assert!(matches!(err, Error::MalformedConfig { .. }));
    }

    #[test]
    fn load_rejects_duplicate_ids() {
        let (_temp, workspace) = workspace_with_registry(
            r#"
[[products]]
id = "dashboard"
vcs_repo = "https://example.com/acme/dashboard.git"
dst_path = "products/dashboard"

[[products]]
id = "dashboard"
vcs_repo = "https://example.com/acme/other.git"
dst_path = "products/other"
"#,
        );
        let err = ProductRegistry::load(&workspace).unwrap_err();
        assert!(
            matches!(err, Error::MalformedConfig { ref reason, .. } if reason.contains("duplicate"))
        );
    }

    #[test]
    fn upsert_appends_then_merges() {
        let (_temp, workspace) = workspace_with_registry("products = []\n");
        let mut registry = ProductRegistry::load(&workspace).unwrap();

        let id = registry
            .upsert(&reconciled_for("https://example.com/acme/dashboard.git", &[]))
            .unwrap();
        assert_eq!(id, "dashboard");
        assert_eq!(registry.ids(), vec!["dashboard"]);

        let entry = registry.get("dashboard").unwrap();
        assert_eq!(entry.vcs_ref, "main");
        assert_eq!(entry.dst_path, PathBuf::from("products/dashboard"));

        // Re-adding with a different ref merges into the existing entry.
        registry
            .upsert(&reconciled_for(
                "https://example.com/acme/dashboard.git",
                &[("vcs_ref", "v2.1.0")],
            ))
            .unwrap();
        assert_eq!(registry.ids(), vec!["dashboard"]);
        let entry = registry.get("dashboard").unwrap();
        assert_eq!(entry.vcs_ref, "v2.1.0");
        assert_eq!(entry.dst_path, PathBuf::from("products/dashboard"));
    }

    #[test]
    fn save_preserves_entry_order() {
        let (_temp, workspace) = workspace_with_registry("products = []\n");
        let mut registry = ProductRegistry::load(&workspace).unwrap();

        for name in ["zeta", "alpha", "midgard"] {
            registry
                .upsert(&reconciled_for(
                    &format!("https://example.com/acme/{name}.git"),
                    &[],
                ))
                .unwrap();
        }
        registry.save().unwrap();

        let reloaded = ProductRegistry::load(&workspace).unwrap();
        assert_eq!(reloaded.ids(), vec!["zeta", "alpha", "midgard"]);
    }

    #[test]
    fn secret_answers_never_reach_the_persisted_registry() {
        let (_temp, workspace) = workspace_with_registry("products = []\n");
        let mut registry = ProductRegistry::load(&workspace).unwrap();

        registry
            .upsert(&reconciled_for(
                "https://example.com/acme/dashboard.git",
                &[
                    ("vcs_auth_type", "token"),
                    ("vcs_auth_token", "t0ps3cret"),
                ],
            ))
            .unwrap();
        registry.save().unwrap();

        let entry = registry.get("dashboard").unwrap();
        assert_eq!(entry.vcs_auth_type, AuthType::Token);
        assert_eq!(entry.vcs_auth_token, None);

        let on_disk = fs::read_to_string(registry.registry_path()).unwrap();
        assert!(!on_disk.contains("t0ps3cret"));
        assert!(!on_disk.contains("vcs_auth_token"));
    }

    #[test]
    fn absolute_dst_path_inside_workspace_is_stored_relative() {
        let (temp, workspace) = workspace_with_registry("products = []\n");
        let mut registry = ProductRegistry::load(&workspace).unwrap();

        let absolute = temp.path().join("products/dashboard");
        registry
            .upsert(&reconciled_for(
                "https://example.com/acme/dashboard.git",
                &[("dst_path", absolute.to_str().unwrap())],
            ))
            .unwrap();

        let entry = registry.get("dashboard").unwrap();
        assert!(entry.dst_path.is_relative());
        assert_eq!(entry.dst_path, PathBuf::from("products/dashboard"));
    }

    #[test]
    fn auth_type_round_trips_through_toml() {
        let (_temp, workspace) = workspace_with_registry(
            r#"
[[products]]
id = "dashboard"
vcs_repo = "https://example.com/acme/dashboard.git"
dst_path = "products/dashboard"
vcs_ref = "main"
vcs_auth_type = "sshkey"
"#,
        );
        let registry = ProductRegistry::load(&workspace).unwrap();
        assert_eq!(
            registry.get("dashboard").unwrap().vcs_auth_type,
            AuthType::SshKey
        );
    }
}
