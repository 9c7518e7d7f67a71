//! Rule execution engine.
//!
//! Drives registered rules over a recovered provider: provider-level
//! rules once per provider, resource-level rules once per resource and
//! data source, attribute-set rules once per recognized schema-set call
//! site inside a resource's lifecycle functions. Rules run in
//! registration order and never short-circuit on findings; a hard error
//! aborts only the failing rule for the current target.

use crate::rule::{
    Issue, LintContext, RegisteredRule, RuleError, RuleKind, SetCall, Severity,
};
use crate::schema::{Provider, Resource};
use crate::ssa::{Callee, InstrKind, Program};
use log::{debug, warn};
use std::collections::HashSet;

/// Symbols recognized as the schema-set operation. Method calls carry the
/// receiver as the first argument, the attribute name second, the value
/// third.
pub const SET_SYMBOLS: [&str; 2] = [
    "(*schema.ResourceData).Set",
    "(*helper/schema.ResourceData).Set",
];

/// A rule invocation that returned a hard error.
#[derive(Debug)]
pub struct RuleFailure {
    pub rule_id: String,
    /// The target the rule was running against (provider or resource
    /// name).
    pub target: String,
    pub error: RuleError,
}

/// Aggregated result of a lint run.
#[derive(Debug, Default)]
pub struct LintResult {
    pub issues: Vec<Issue>,
    pub failures: Vec<RuleFailure>,
}

impl LintResult {
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// A run with zero issues and zero rule failures is clean.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty() && self.failures.is_empty()
    }
}

/// The linter: an ordered set of registered rules.
#[derive(Default)]
pub struct Linter {
    rules: Vec<RegisteredRule>,
}

impl Linter {
    /// An empty linter with no rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// A linter loaded with the built-in rules.
    pub fn with_builtin_rules() -> Self {
        Self {
            rules: crate::rules::builtin_rules(),
        }
    }

    /// Register a rule; execution follows registration order.
    pub fn register(&mut self, rule: RegisteredRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter()
    }

    /// Run all registered rules against the provider. Pure read of the
    /// program and schema; only the returned result accumulates state.
    pub fn lint(&self, program: &Program, provider: &Provider) -> LintResult {
        let ctx = LintContext { program };
        let mut result = LintResult::default();

        for rule in &self.rules {
            if let RuleKind::Provider(r) = &rule.kind {
                collect(
                    &mut result,
                    &rule.id,
                    &provider.name,
                    r.check_provider(&ctx, provider),
                );
            }
        }

        for resource in provider.resources.iter().chain(provider.data_sources.iter()) {
            let set_calls = find_set_calls(program, resource);

            for rule in &self.rules {
                match &rule.kind {
                    RuleKind::Provider(_) => {}
                    RuleKind::Resource(r) => {
                        collect(
                            &mut result,
                            &rule.id,
                            &resource.name,
                            r.check_resource(&ctx, provider, resource),
                        );
                    }
                    RuleKind::AttributeSet(r) => {
                        for (call, attr_name) in &set_calls {
                            let attribute = resource.attribute(attr_name);
                            let outcome = r.check_attribute_set(
                                &ctx, resource, attribute, attr_name, *call,
                            );
                            let failed = outcome.is_err();
                            collect(&mut result, &rule.id, &resource.name, outcome);
                            if failed {
                                // The error aborts this rule for the
                                // remaining call sites of this resource.
                                break;
                            }
                        }
                    }
                }
            }
        }

        result
    }
}

/// Run the built-in rules against a provider.
pub fn lint(program: &Program, provider: &Provider) -> LintResult {
    Linter::with_builtin_rules().lint(program, provider)
}

fn collect(
    result: &mut LintResult,
    rule_id: &str,
    target: &str,
    outcome: Result<Vec<Issue>, RuleError>,
) {
    match outcome {
        Ok(issues) => {
            for mut issue in issues {
                issue.rule_id = rule_id.to_string();
                result.issues.push(issue);
            }
        }
        Err(error) => {
            warn!("rule {} failed on {}: {}", rule_id, target, error);
            result.failures.push(RuleFailure {
                rule_id: rule_id.to_string(),
                target: target.to_string(),
                error,
            });
        }
    }
}

/// Recognized attribute-set call sites within a resource's lifecycle
/// functions, paired with the attribute name written at each call.
fn find_set_calls(program: &Program, resource: &Resource) -> Vec<(SetCall, String)> {
    let mut calls = Vec::new();
    let mut visited = HashSet::new();

    for func_id in resource.lifecycle_funcs() {
        if !visited.insert(func_id) {
            continue;
        }
        let func = program.func(func_id);
        for instr in program.instrs_of(func) {
            let InstrKind::Call { callee, args } = &instr.kind else {
                continue;
            };
            let Callee::Symbol(symbol) = callee else {
                continue;
            };
            if !SET_SYMBOLS.contains(&symbol.as_str()) {
                continue;
            }
            let name = args.get(1).and_then(|&v| program.const_str(v));
            let Some(name) = name else {
                debug!(
                    "{}: set call at {} with non-constant attribute name; skipping",
                    resource.name, instr.pos
                );
                continue;
            };
            calls.push((
                SetCall {
                    func: func_id,
                    instr: instr.id,
                },
                name.to_string(),
            ));
        }
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{
        AttributeSetRule, LintContext, ProviderRule, ResourceRule, RuleResult,
    };
    use crate::schema::{Attribute, ResourceKind};
    use crate::ssa::{FuncId, Pos, TypeKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Provider rule that records its invocation and reports one issue.
    struct CountingProviderRule {
        log: Rc<RefCell<Vec<String>>>,
        tag: &'static str,
    }

    impl ProviderRule for CountingProviderRule {
        fn check_provider(&self, _ctx: &LintContext<'_>, provider: &Provider) -> RuleResult {
            self.log.borrow_mut().push(self.tag.to_string());
            Ok(vec![Issue::at(
                provider.pos.clone(),
                format!("from {}", self.tag),
            )])
        }
    }

    struct FailingResourceRule;

    impl ResourceRule for FailingResourceRule {
        fn check_resource(
            &self,
            _ctx: &LintContext<'_>,
            _provider: &Provider,
            resource: &Resource,
        ) -> RuleResult {
            Err(RuleError::Other(format!("boom on {}", resource.name)))
        }
    }

    struct RecordingSetRule {
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl AttributeSetRule for RecordingSetRule {
        fn check_attribute_set(
            &self,
            _ctx: &LintContext<'_>,
            _resource: &Resource,
            attribute: Option<&Attribute>,
            attr_name: &str,
            _call: SetCall,
        ) -> RuleResult {
            self.log
                .borrow_mut()
                .push(format!("{}:{}", attr_name, attribute.is_some()));
            if self.fail {
                return Err(RuleError::Other("set rule failed".to_string()));
            }
            Ok(Vec::new())
        }
    }

    /// A resource whose read function issues set calls for the given
    /// attribute names (all with constant names).
    fn program_with_set_calls(names: &[&str]) -> (Program, Resource) {
        let mut b = Program::builder();
        let str_ty = b.ty(TypeKind::Str);
        let opaque = b.ty(TypeKind::Opaque);
        let read = b.func("widget", "resourceWidgetRead", Pos::none());
        let d = b.param(read, opaque, "d");

        for (i, name) in names.iter().enumerate() {
            let name_arg = b.const_str(name);
            let value_arg = b.const_str("v");
            b.emit(
                read,
                InstrKind::Call {
                    callee: Callee::Symbol(SET_SYMBOLS[0].to_string()),
                    args: vec![d, name_arg, value_arg],
                },
                str_ty,
                Pos::new("resource.go", 10 + i as u32, 2),
            );
        }

        let mut resource = Resource::new("widget_thing", ResourceKind::Resource, Pos::none());
        resource.read = Some(read);
        resource.attributes.push(Attribute {
            name: "name".to_string(),
            ..Attribute::default()
        });
        (b.finish(), resource)
    }

    #[test]
    fn test_rules_run_in_registration_order_without_short_circuit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut linter = Linter::new();
        linter.register(RegisteredRule::new(
            "first",
            RuleKind::Provider(Box::new(CountingProviderRule {
                log: Rc::clone(&log),
                tag: "a",
            })),
        ));
        linter.register(RegisteredRule::new(
            "second",
            RuleKind::Provider(Box::new(CountingProviderRule {
                log: Rc::clone(&log),
                tag: "b",
            })),
        ));

        let program = Program::builder().finish();
        let provider = Provider::default();
        let result = linter.lint(&program, &provider);

        assert_eq!(*log.borrow(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].rule_id, "first");
        assert_eq!(result.issues[1].rule_id, "second");
    }

    #[test]
    fn test_rule_failure_does_not_abort_other_rules_or_targets() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut linter = Linter::new();
        linter.register(RegisteredRule::new(
            "failing",
            RuleKind::Resource(Box::new(FailingResourceRule)),
        ));
        linter.register(RegisteredRule::new(
            "counting",
            RuleKind::Provider(Box::new(CountingProviderRule {
                log: Rc::clone(&log),
                tag: "p",
            })),
        ));

        let mut provider = Provider::default();
        provider
            .resources
            .push(Resource::new("widget_a", ResourceKind::Resource, Pos::none()));
        provider
            .resources
            .push(Resource::new("widget_b", ResourceKind::Resource, Pos::none()));

        let program = Program::builder().finish();
        let result = linter.lint(&program, &provider);

        // One failure per resource: the error is isolated per target.
        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].target, "widget_a");
        assert_eq!(result.failures[1].target, "widget_b");
        // The provider rule still ran and reported.
        assert_eq!(result.issues.len(), 1);
        assert!(!result.is_clean());
    }

    #[test]
    fn test_set_call_discovery_and_attribute_resolution() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (program, resource) = program_with_set_calls(&["name", "unknown"]);
        let mut provider = Provider::default();
        provider.resources.push(resource);

        let mut linter = Linter::new();
        linter.register(RegisteredRule::new(
            "recording",
            RuleKind::AttributeSet(Box::new(RecordingSetRule {
                log: Rc::clone(&log),
                fail: false,
            })),
        ));

        let result = linter.lint(&program, &provider);
        assert!(result.is_clean());
        // "name" resolves to a schema entry, "unknown" does not.
        assert_eq!(
            *log.borrow(),
            vec!["name:true".to_string(), "unknown:false".to_string()]
        );
    }

    #[test]
    fn test_set_rule_error_stops_remaining_call_sites_for_that_rule() {
        let failing_log = Rc::new(RefCell::new(Vec::new()));
        let healthy_log = Rc::new(RefCell::new(Vec::new()));
        let (program, resource) = program_with_set_calls(&["name", "other"]);
        let mut provider = Provider::default();
        provider.resources.push(resource);

        let mut linter = Linter::new();
        linter.register(RegisteredRule::new(
            "failing",
            RuleKind::AttributeSet(Box::new(RecordingSetRule {
                log: Rc::clone(&failing_log),
                fail: true,
            })),
        ));
        linter.register(RegisteredRule::new(
            "healthy",
            RuleKind::AttributeSet(Box::new(RecordingSetRule {
                log: Rc::clone(&healthy_log),
                fail: false,
            })),
        ));

        let result = linter.lint(&program, &provider);
        // The failing rule saw only the first call site.
        assert_eq!(failing_log.borrow().len(), 1);
        // The healthy rule still saw both.
        assert_eq!(healthy_log.borrow().len(), 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].rule_id, "failing");
    }

    #[test]
    fn test_non_constant_set_name_is_skipped() {
        let mut b = Program::builder();
        let str_ty = b.ty(TypeKind::Str);
        let opaque = b.ty(TypeKind::Opaque);
        let read = b.func("widget", "resourceWidgetRead", Pos::none());
        let d = b.param(read, opaque, "d");
        let dynamic_name = b.param(read, str_ty, "attr");
        let value = b.const_str("v");
        b.emit(
            read,
            InstrKind::Call {
                callee: Callee::Symbol(SET_SYMBOLS[0].to_string()),
                args: vec![d, dynamic_name, value],
            },
            str_ty,
            Pos::none(),
        );
        let program = b.finish();

        let mut resource = Resource::new("widget_thing", ResourceKind::Resource, Pos::none());
        resource.read = Some(FuncId(0));

        let calls = find_set_calls(&program, &resource);
        assert!(calls.is_empty());
    }

    #[test]
    fn test_shared_lifecycle_function_scanned_once() {
        let (program, mut resource) = program_with_set_calls(&["name"]);
        // Bind the same function as both read and update.
        resource.update = resource.read;

        let calls = find_set_calls(&program, &resource);
        assert_eq!(calls.len(), 1);
    }
}
