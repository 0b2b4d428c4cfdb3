use crate::engine::GitTemplateEngine;
use crate::error::{Error, Result};
use crate::product::Product;
use crate::prompt::{Prompt, TerminalPrompt};
use crate::registry::ProductRegistry;
use crate::vault::CredentialVault;
use crate::{ui, Workspace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Update,
}

impl Operation {
    fn verb(self) -> &'static str {
        match self {
            Operation::Install => "install",
            Operation::Update => "update",
        }
    }

    fn done_label(self) -> &'static str {
        match self {
            Operation::Install => "Installed",
            Operation::Update => "Updated",
        }
    }
}

pub fn execute(workspace: &Workspace, id: Option<String>, operation: Operation) -> Result<()> {
    let registry = ProductRegistry::load(workspace)?;

    let id = match id {
        Some(id) => id,
        None => {
            let ids = registry.ids();
            if ids.is_empty() {
                ui::info("No products registered. Use 'wpm add' to register one.");
                return Ok(());
            }
            TerminalPrompt.select(
                &format!("Select the product to {}", operation.verb()),
                &ids,
            )?
        }
    };

    let details = registry
        .get(&id)
        .ok_or_else(|| Error::UnknownProduct {
            id: id.clone(),
            available: registry.ids(),
        })?
        .clone();

    let product = Product::new(details, workspace.clone());
    let vault = CredentialVault::new(workspace);
    let engine = GitTemplateEngine;

    let progress = ui::Progress::new(
        "Fetching",
        format!(
            "{} '{id}' from {}",
            operation.verb(),
            product.details().vcs_repo
        ),
    );

    let result = match operation {
        Operation::Install => product.install(&engine, &vault),
        Operation::Update => product.update(&engine, &vault),
    };

    match result {
        Ok(()) => {
            progress.success(
                operation.done_label(),
                Some(format!("into {:?}", product.dst_path())),
            );
            Ok(())
        }
        Err(err) => {
            progress.fail("Failed", "check connection and authentication");
            Err(err)
        }
    }
}
