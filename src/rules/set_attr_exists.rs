//! The attribute name passed to the schema-set call must be declared in
//! the resource's schema.

use crate::rule::{AttributeSetRule, Issue, LintContext, RuleResult, SetCall, Severity};
use crate::schema::{Attribute, Resource};

pub struct SetAttributeExists;

impl AttributeSetRule for SetAttributeExists {
    fn check_attribute_set(
        &self,
        ctx: &LintContext<'_>,
        resource: &Resource,
        attribute: Option<&Attribute>,
        attr_name: &str,
        call: SetCall,
    ) -> RuleResult {
        // The attribute list of a partially parsed resource is not
        // trustworthy; a miss there proves nothing.
        if resource.partial_parse {
            return Ok(Vec::new());
        }

        if attribute.is_some() {
            return Ok(Vec::new());
        }

        let pos = ctx.program.instr(call.instr).pos.clone();
        Ok(vec![Issue::at(
            pos,
            format!(
                "attribute {:?} passed to d.Set is not declared in the schema of {}",
                attr_name, resource.name
            ),
        )
        .with_severity(Severity::Error)])
    }
}
