//! provlint - Static analysis for Terraform provider plugins
//!
//! Inspects the lowered SSA representation of a provider plugin,
//! recovers the schema it declares (resources, data sources, attributes
//! and lifecycle bindings), and runs registered correctness rules over
//! the schema and the underlying instruction graph.
//!
//! # Architecture
//!
//! ```text
//! Program (SSA) -> recover -> Provider -> Linter -> Issues
//! ```
//!
//! The front end that lowers source code into [`ssa::Program`] is an
//! external collaborator; this crate only consumes the graph.
//!
//! # Example
//!
//! ```no_run
//! use provlint::{recover, Linter};
//! use provlint::ssa::Program;
//!
//! let program: Program = serde_json::from_str("...").unwrap();
//! let provider = recover(&program, "widget").unwrap();
//!
//! let linter = Linter::with_builtin_rules();
//! let result = linter.lint(&program, &provider);
//! for issue in &result.issues {
//!     println!("{}: {} ({})", issue.pos, issue.message, issue.rule_id);
//! }
//! ```

pub mod engine;
pub mod recover;
pub mod rule;
pub mod rules;
pub mod schema;
pub mod ssa;
pub mod trace;

// Re-export main types
pub use engine::{lint, LintResult, Linter, RuleFailure, SET_SYMBOLS};
pub use recover::{recover, RecoverError};
pub use rule::{
    AttributeSetRule, Issue, LintContext, ProviderRule, RegisteredRule, ResourceRule, RuleError,
    RuleKind, RuleResult, SetCall, Severity,
};
pub use schema::{AttrType, Attribute, Provider, Resource, ResourceKind};
pub use ssa::{Pos, Program, ProgramBuilder};
pub use trace::value_path;
