//! Do not dereference pointers before passing a value to the schema-set
//! call.
//!
//! The set operation accepts pointer values and unwraps them itself,
//! handling nil safely. A manual dereference before the call risks a
//! runtime panic on a nil value. Dereferences that load through a field
//! or element address are ordinary aggregate lookups and are not
//! reported.

use crate::rule::{AttributeSetRule, Issue, LintContext, RuleError, RuleResult, SetCall};
use crate::schema::{Attribute, Resource};
use crate::ssa::InstrKind;
use crate::trace::value_path;

pub struct NoDerefInSet;

impl AttributeSetRule for NoDerefInSet {
    fn check_attribute_set(
        &self,
        ctx: &LintContext<'_>,
        _resource: &Resource,
        _attribute: Option<&Attribute>,
        attr_name: &str,
        call: SetCall,
    ) -> RuleResult {
        let program = ctx.program;
        let instr = program.instr(call.instr);
        let InstrKind::Call { args, .. } = &instr.kind else {
            return Err(RuleError::MalformedCall(
                "attribute-set target is not a call".to_string(),
            ));
        };
        // Receiver, attribute name, value.
        let Some(&value_arg) = args.get(2) else {
            return Err(RuleError::MalformedCall(format!(
                "set call for {:?} has no value argument",
                attr_name
            )));
        };

        for step in value_path(program, value_arg) {
            let InstrKind::Deref { addr } = &program.instr(step).kind else {
                continue;
            };

            // A load through a field or element address is a pointer
            // lookup into an aggregate, not a manual unwrap.
            if let Some(def) = program.defining_instr(*addr) {
                match program.instr(def).kind {
                    InstrKind::FieldAddr { .. } | InstrKind::IndexAddr { .. } => {
                        return Ok(Vec::new())
                    }
                    _ => {}
                }
            }

            if program.pointer_depth(program.value(*addr).ty) > 0 {
                return Ok(vec![Issue::at(
                    instr.pos.clone(),
                    format!(
                        "do not dereference value for attribute {:?} when calling d.Set",
                        attr_name
                    ),
                )]);
            }
        }

        Ok(Vec::new())
    }
}
