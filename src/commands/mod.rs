use crate::cli::{Cli, Commands};
use crate::error::{Error, Result};
use crate::{ui, Workspace};

mod add;
mod init;
mod install;
mod list;

pub fn execute(cli: Cli) -> Result<()> {
    // Resolve the workspace - this is the root entry point
    let workspace = Workspace::discover()?;

    match cli.command {
        Commands::Init => init::execute(&workspace),

        Commands::List => list::execute(&workspace),

        Commands::Add {
            repository,
            data,
            quiet,
            install,
        } => add::execute(&workspace, repository, data, quiet, install),

        Commands::Install { id } => install::execute(&workspace, id, install::Operation::Install),

        Commands::Update { id } => install::execute(&workspace, id, install::Operation::Update),
    }
}

/// Map a typed failure to user-facing output: one line, no chain.
pub fn report_failure(err: &Error) {
    ui::error(err);
}
