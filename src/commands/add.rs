use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::prompt::{Prompt, TerminalPrompt};
use crate::questions::{product_questions, reconcile};
use crate::registry::ProductRegistry;
use crate::vault::CredentialVault;
use crate::{ui, Workspace};

use super::install;

pub fn execute(
    workspace: &Workspace,
    repository: Option<String>,
    data: Option<String>,
    quiet: bool,
    install_after: bool,
) -> Result<()> {
    run(workspace, repository, data, quiet, install_after, &TerminalPrompt)
}

fn run(
    workspace: &Workspace,
    repository: Option<String>,
    data: Option<String>,
    quiet: bool,
    install_after: bool,
    prompt: &dyn Prompt,
) -> Result<()> {
    let mut registry = ProductRegistry::load(workspace)?;

    let provided = parse_data(data.as_deref())?;
    let repository = repository.as_deref().or_else(|| {
        provided.get("vcs_repo").map(String::as_str)
    });

    let questions = product_questions(repository);
    let reconciled = reconcile(&questions, &provided, quiet, prompt)?;

    let id = reconciled
        .get("id")
        .map(ToString::to_string)
        .ok_or_else(|| Error::validation("id", "missing required answer"))?;

    if registry.contains(&id) && !quiet {
        let overwrite =
            prompt.confirm(&format!("Product '{id}' already exists. Overwrite?"), true)?;
        if !overwrite {
            return Err(Error::Aborted(id));
        }
    }

    registry.upsert(&reconciled)?;

    // Secret answers go to the vault, never to the registry file.
    let vault = CredentialVault::new(workspace);
    for (name, value) in reconciled.secrets() {
        let value = value.to_string();
        if value.is_empty() {
            tracing::debug!("skipping empty secret answer '{name}'");
            continue;
        }
        vault.save(&id, &value)?;
    }

    registry.save()?;
    ui::success(
        "Added",
        format!("'{id}' to {:?}", registry.registry_path()),
    );

    let run_install = install_after
        || (!quiet && prompt.confirm(&format!("Install '{id}' now?"), true)?);
    if run_install {
        install::execute(workspace, Some(id), install::Operation::Install)?;
    }

    Ok(())
}

/// Parse the `--data` JSON object into raw answer strings. Scalars only;
/// nested values have no matching question type.
fn parse_data(data: Option<&str>) -> Result<BTreeMap<String, String>> {
    let Some(data) = data else {
        return Ok(BTreeMap::new());
    };

    let value: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| Error::validation("--data", format!("invalid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| Error::validation("--data", "expected a JSON object"))?;

    let mut out = BTreeMap::new();
    for (name, value) in object {
        let raw = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(Error::validation(
                    name,
                    format!("unsupported value in --data: {other}"),
                ))
            }
        };
        out.insert(name.clone(), raw);
    }
    Ok(out)
}
