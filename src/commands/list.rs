use crate::error::Result;
use crate::registry::ProductRegistry;
use crate::{ui, Workspace};

pub fn execute(workspace: &Workspace) -> Result<()> {
    let registry = ProductRegistry::load(workspace)?;

    if registry.list().is_empty() {
        ui::info("No products registered. Use 'wpm add' to register one.");
        return Ok(());
    }

    for product in registry.list() {
        ui::status(
            "Product",
            format!(
                "{}\nrepo: {} ({})\npath: {}\nauth: {}",
                product.id,
                product.vcs_repo,
                product.vcs_ref,
                product.dst_path.display(),
                product.vcs_auth_type,
            ),
        );
    }
    Ok(())
}
