//! Built-in rules.

pub mod lifecycle;
pub mod name_prefix;
pub mod no_deref;
pub mod set_attr_exists;

pub use lifecycle::LifecycleBound;
pub use name_prefix::ResourceNamePrefix;
pub use no_deref::NoDerefInSet;
pub use set_attr_exists::SetAttributeExists;

use crate::rule::{RegisteredRule, RuleKind};

/// All built-in rules, in registration order.
pub fn builtin_rules() -> Vec<RegisteredRule> {
    vec![
        RegisteredRule::new(
            "do-not-dereference-in-set",
            RuleKind::AttributeSet(Box::new(NoDerefInSet)),
        ),
        RegisteredRule::new(
            "set-attribute-exists",
            RuleKind::AttributeSet(Box::new(SetAttributeExists)),
        ),
        RegisteredRule::new(
            "missing-lifecycle-functions",
            RuleKind::Resource(Box::new(LifecycleBound)),
        ),
        RegisteredRule::new(
            "resource-name-prefix",
            RuleKind::Provider(Box::new(ResourceNamePrefix)),
        ),
    ]
}
