use clap::{Parser, Subcommand};

/// Workspace Product Manager
///
/// wpm keeps a declarative registry of products (external repositories or
/// templates) attached to a workspace, drives their installation and
/// updates, and keeps credential material out of the registry file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a workspace skeleton in the current directory
    ///
    /// Creates config/, config/secrets/, data/, logs/ and an empty product
    /// registry. Safe to re-run; existing files are kept.
    Init,

    /// List registered products
    List,

    /// Register a product (insert or update)
    Add {
        /// Git URL of the product's repository
        #[arg(value_name = "REPOSITORY")]
        repository: Option<String>,

        /// Avoid prompts by providing answers as a JSON object, e.g.
        /// '{"id": "dashboard", "vcs_ref": "v2.1.0"}'
        #[arg(long, value_name = "JSON")]
        data: Option<String>,

        /// Don't ask questions; use defaults and overwrite existing entries
        #[arg(short, long)]
        quiet: bool,

        /// Install the product right after registering it
        #[arg(long)]
        install: bool,
    },

    /// Fetch resources for a product that has already been added
    Install {
        /// Id of the product (prompted when omitted)
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Update an installed product from its recorded answers
    Update {
        /// Id of the product (prompted when omitted)
        #[arg(value_name = "ID")]
        id: Option<String>,
    },
}
