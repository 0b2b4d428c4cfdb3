// Public API
pub mod cli;
pub mod commands;

// Core domain types
mod credentials;
mod engine;
mod error;
mod product;
mod prompt;
mod questions;
mod registry;
mod ui;
mod vault;
mod workspace;

// Re-export main types
pub use credentials::CredentialScope;
pub use engine::{AnswerFile, GitTemplateEngine, TemplateEngine};
pub use error::{Error, Result};
pub use product::Product;
pub use prompt::{Prompt, TerminalPrompt};
pub use questions::{
    product_questions, reconcile, AnswerValue, ParsedAnswer, QuestionKind, QuestionSpec, Reconciled,
};
pub use registry::{AuthType, ProductDetails, ProductRegistry};
pub use vault::CredentialVault;
pub use workspace::{Workspace, WorkspacePath, ANSWERS_FILE, BASE_DIR_ENV, SHARED_DIRS};
