use crate::error::Result;
use crate::workspace::WorkspacePath;
use crate::{ui, Workspace};

pub fn execute(workspace: &Workspace) -> Result<()> {
    let existed = workspace.exists();
    workspace.init()?;

    let root = workspace.path(WorkspacePath::Root);
    if existed {
        ui::info(format!("Workspace at {:?} already initialized", root));
    } else {
        ui::success("Initialized", format!("workspace at {:?}", root));
        ui::status("", "Register a product with 'wpm add <repository>'.");
    }
    Ok(())
}
