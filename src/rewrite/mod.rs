pub mod context;
pub mod engine;
pub mod format;
pub mod functions;
pub mod template;

pub use engine::{RewriteEngine, RuleOutcome};
pub use template::{Template, TemplateError, Value};
