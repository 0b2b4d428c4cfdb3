use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::credentials::CredentialScope;

/// Record written into each materialized product at the fixed answers-file
/// path. `update` re-applies from it without asking anything again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerFile {
    /// Source the product was materialized from.
    pub src_path: String,
    /// Branch, tag, or commit that was checked out.
    pub vcs_ref: String,
}

impl AnswerFile {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read answers file {:?}", path))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse answers file {:?}", path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {:?}", parent))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize answers file")?;
        fs::write(path, contents).with_context(|| format!("failed to write {:?}", path))
    }
}

/// External materialization collaborator.
///
/// `copy` produces a fresh checkout at a ref; `update` re-applies from the
/// previously recorded answers file. Implementations receive the credential
/// scope explicitly with every call and must not stash it in global state.
/// Failures bubble up as plain diagnostics; the product operation boundary
/// wraps them into a single typed failure.
pub trait TemplateEngine {
    fn copy(
        &self,
        src: &str,
        dst: &Path,
        vcs_ref: &str,
        answers_file: &Path,
        scope: &CredentialScope,
    ) -> Result<()>;

    fn update(&self, dst: &Path, answers_file: &Path, scope: &CredentialScope) -> Result<()>;
}

/// Default engine: materializes products as git checkouts.
#[derive(Debug, Default)]
pub struct GitTemplateEngine;

impl GitTemplateEngine {
    fn checkout_ref(repo: &git2::Repository, vcs_ref: &str) -> Result<()> {
        // Prefer the remote-tracking ref so branch updates land after a fetch.
        let object = repo
            .revparse_single(&format!("refs/remotes/origin/{vcs_ref}"))
            .or_else(|_| repo.revparse_single(vcs_ref))
            .with_context(|| format!("ref '{vcs_ref}' not found"))?;
        let commit = object
            .peel_to_commit()
            .with_context(|| format!("ref '{vcs_ref}' does not point at a commit"))?;

        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(commit.as_object(), Some(&mut checkout))
            .with_context(|| format!("failed to check out '{vcs_ref}'"))?;
        repo.set_head_detached(commit.id())
            .context("failed to move HEAD")?;
        Ok(())
    }

    fn fetch_origin(repo: &git2::Repository, scope: &CredentialScope) -> Result<()> {
        let mut remote = repo
            .find_remote("origin")
            .context("repository has no 'origin' remote")?;
        let mut options = scope.fetch_options();
        remote
            .fetch(&[] as &[&str], Some(&mut options), None)
            .context("fetch from origin failed")?;
        Ok(())
    }
}

impl TemplateEngine for GitTemplateEngine {
    fn copy(
        &self,
        src: &str,
        dst: &Path,
        vcs_ref: &str,
        answers_file: &Path,
        scope: &CredentialScope,
    ) -> Result<()> {
        let repo = if dst.join(".git").exists() {
            // Re-running install over an existing checkout: refresh in place.
            tracing::debug!("reusing existing checkout at {:?}", dst);
            let repo = git2::Repository::open(dst)
                .with_context(|| format!("failed to open repository at {:?}", dst))?;
            Self::fetch_origin(&repo, scope)?;
            repo
        } else {
            tracing::debug!("cloning {src} into {:?}", dst);
            if let Some(parent) = dst.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {:?}", parent))?;
            }
            git2::build::RepoBuilder::new()
                .fetch_options(scope.fetch_options())
                .clone(src, dst)
                .with_context(|| format!("failed to clone {src}"))?
        };

        Self::checkout_ref(&repo, vcs_ref)?;

        AnswerFile {
            src_path: src.to_string(),
            vcs_ref: vcs_ref.to_string(),
        }
        .save(&dst.join(answers_file))
    }

    fn update(&self, dst: &Path, answers_file: &Path, scope: &CredentialScope) -> Result<()> {
        let answers = AnswerFile::load(&dst.join(answers_file))
            .context("product has not been installed (missing answers file)")?;

        let repo = git2::Repository::open(dst)
            .with_context(|| format!("failed to open repository at {:?}", dst))?;
        Self::fetch_origin(&repo, scope)?;
        Self::checkout_ref(&repo, &answers.vcs_ref)
    }
}
