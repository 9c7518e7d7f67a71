//! Rule contracts and diagnostic types.

use crate::schema::{Attribute, Provider, Resource};
use crate::ssa::{FuncId, InstrId, Pos, Program};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Severity level for issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,
    /// Warning - potential issue
    #[default]
    Warning,
    /// Error - definite problem
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "hint" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" | "err" => Ok(Severity::Error),
            _ => Err(()),
        }
    }
}

/// A diagnostic finding: a source position and a message. The rule ID is
/// attached by the engine when the issue is collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Rule that reported this issue
    pub rule_id: String,
    /// Severity level
    pub severity: Severity,
    /// Human-readable message
    pub message: String,
    /// Source position
    pub pos: Pos,
}

impl Issue {
    /// Create an issue at a position with the default severity.
    pub fn at(pos: Pos, message: impl Into<String>) -> Self {
        Self {
            rule_id: String::new(),
            severity: Severity::default(),
            message: message.into(),
            pos,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Hard error from a rule invocation. Aborts the rule for the current
/// target only; other rules and targets continue.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("malformed call site: {0}")]
    MalformedCall(String),

    #[error("{0}")]
    Other(String),
}

/// Result of one rule invocation.
pub type RuleResult = Result<Vec<Issue>, RuleError>;

/// Read-only context shared with every rule invocation.
pub struct LintContext<'a> {
    pub program: &'a Program,
}

/// An attribute-set call site: a call to the schema-set operation inside
/// one of a resource's lifecycle functions.
#[derive(Debug, Clone, Copy)]
pub struct SetCall {
    /// The lifecycle function containing the call.
    pub func: FuncId,
    /// The call instruction.
    pub instr: InstrId,
}

/// Rule invoked once per provider.
pub trait ProviderRule {
    fn check_provider(&self, ctx: &LintContext<'_>, provider: &Provider) -> RuleResult;
}

/// Rule invoked once per resource (and data source) of a provider.
pub trait ResourceRule {
    fn check_resource(
        &self,
        ctx: &LintContext<'_>,
        provider: &Provider,
        resource: &Resource,
    ) -> RuleResult;
}

/// Rule invoked once per recognized attribute-set call site within a
/// resource's lifecycle functions. `attribute` is absent when the name at
/// the call site does not resolve to a schema entry.
pub trait AttributeSetRule {
    fn check_attribute_set(
        &self,
        ctx: &LintContext<'_>,
        resource: &Resource,
        attribute: Option<&Attribute>,
        attr_name: &str,
        call: SetCall,
    ) -> RuleResult;
}

/// The closed set of rule capabilities. A rule implements exactly one;
/// the engine dispatches on the variant to pick iteration granularity.
pub enum RuleKind {
    Provider(Box<dyn ProviderRule>),
    Resource(Box<dyn ResourceRule>),
    AttributeSet(Box<dyn AttributeSetRule>),
}

/// A rule plus its registration identity.
pub struct RegisteredRule {
    pub id: String,
    pub kind: RuleKind,
}

impl RegisteredRule {
    pub fn new(id: &str, kind: RuleKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
        }
    }
}
