use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable overriding the workspace root. Defaults to the
/// current working directory, so wpm can be invoked from inside a workspace.
pub const BASE_DIR_ENV: &str = "WPM_BASE_DIR";

/// Shared subdirectories linked from the workspace into each installed
/// product. Order matters: `config` is created before `config/secrets`.
pub const SHARED_DIRS: &[&str] = &["config", "config/secrets", "data", "logs"];

/// Fixed path, relative to a product's destination, where the template
/// engine records the source and ref used for materialization.
pub const ANSWERS_FILE: &str = "config/install_answers.toml";

/// Template file definition for workspace initialization
struct TemplateFile {
    /// Path relative to workspace root
    path: &'static str,
    /// File content embedded at compile time
    content: &'static str,
}

const TEMPLATE_FILES: &[TemplateFile] = &[
    TemplateFile {
        path: "README.md",
        content: include_str!("../templates/workspace/README.md"),
    },
    TemplateFile {
        path: "config/products.toml",
        content: include_str!("../templates/workspace/products.toml"),
    },
];

/// Workspace path types
#[derive(Debug, Clone, Copy)]
pub enum WorkspacePath {
    /// Workspace root
    Root,
    /// Config directory: workspace/config
    Config,
    /// Product registry: workspace/config/products.toml
    Registry,
    /// Secrets directory: workspace/config/secrets
    Secrets,
    /// Shared data directory: workspace/data
    Data,
    /// Shared logs directory: workspace/logs
    Logs,
}

/// Workspace - the directory tree that products are attached to.
///
/// The registry, secrets vault, and per-product shared directories all live
/// under the workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
}

impl Workspace {
    /// Resolve the workspace from `WPM_BASE_DIR` or the current directory.
    pub fn discover() -> Result<Self> {
        let base_dir = match env::var(BASE_DIR_ENV) {
            Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
            _ => env::current_dir()
                .map_err(|e| Error::io("failed to determine current directory", e))?,
        };

        Ok(Self { base_dir })
    }

    /// Create a workspace rooted at an explicit directory.
    pub fn at(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Get path for a specific workspace location
    pub fn path(&self, path_type: WorkspacePath) -> PathBuf {
        match path_type {
            WorkspacePath::Root => self.base_dir.clone(),
            WorkspacePath::Config => self.base_dir.join("config"),
            WorkspacePath::Registry => self.base_dir.join("config").join("products.toml"),
            WorkspacePath::Secrets => self.base_dir.join("config").join("secrets"),
            WorkspacePath::Data => self.base_dir.join("data"),
            WorkspacePath::Logs => self.base_dir.join("logs"),
        }
    }

    /// Check if the workspace has been initialized (registry file exists)
    pub fn exists(&self) -> bool {
        self.path(WorkspacePath::Registry).is_file()
    }

    /// Resolve a stored (workspace-relative) destination to an absolute path.
    pub fn resolve(&self, relative: impl AsRef<Path>) -> PathBuf {
        let relative = relative.as_ref();
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_dir.join(relative)
        }
    }

    /// Make a destination path workspace-relative for storage.
    ///
    /// Absolute paths outside the workspace root are rejected so the
    /// registry never records machine-specific locations.
    pub fn relativize(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        path.strip_prefix(&self.base_dir)
            .map(Path::to_path_buf)
            .map_err(|_| {
                Error::validation(
                    "dst_path",
                    format!(
                        "absolute path {:?} is outside the workspace root {:?}",
                        path, self.base_dir
                    ),
                )
            })
    }

    /// Initialize the workspace skeleton. Idempotent: existing files and
    /// directories are left untouched.
    pub fn init(&self) -> Result<()> {
        for dir in SHARED_DIRS {
            let path = self.base_dir.join(dir);
            fs::create_dir_all(&path)
                .map_err(|e| Error::io(format!("failed to create directory {:?}", path), e))?;
        }

        for template in TEMPLATE_FILES {
            let file_path = self.base_dir.join(template.path);
            if file_path.exists() {
                tracing::debug!("keeping existing {:?}", file_path);
                continue;
            }

            if let Some(parent) = file_path.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::io(format!("failed to create directory {:?}", parent), e)
                })?;
            }

            fs::write(&file_path, template.content)
                .map_err(|e| Error::io(format!("failed to write {:?}", file_path), e))?;
        }

        Ok(())
    }
}
