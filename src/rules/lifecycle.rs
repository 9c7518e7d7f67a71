//! Resources must bind the lifecycle functions their kind requires:
//! create, read and delete for managed resources, read for data sources.

use crate::rule::{Issue, LintContext, ResourceRule, RuleResult, Severity};
use crate::schema::{Provider, Resource, ResourceKind};

pub struct LifecycleBound;

impl ResourceRule for LifecycleBound {
    fn check_resource(
        &self,
        _ctx: &LintContext<'_>,
        _provider: &Provider,
        resource: &Resource,
    ) -> RuleResult {
        // Bindings of a partially parsed resource may simply not have
        // been recovered; stay quiet rather than guess.
        if resource.partial_parse {
            return Ok(Vec::new());
        }

        let mut missing: Vec<&str> = Vec::new();
        match resource.kind {
            ResourceKind::Resource => {
                if resource.create.is_none() {
                    missing.push("create");
                }
                if resource.read.is_none() {
                    missing.push("read");
                }
                if resource.delete.is_none() {
                    missing.push("delete");
                }
            }
            ResourceKind::DataSource => {
                if resource.read.is_none() {
                    missing.push("read");
                }
            }
        }

        if missing.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![Issue::at(
            resource.pos.clone(),
            format!(
                "{} {} does not bind required function(s): {}",
                resource.kind,
                resource.name,
                missing.join(", ")
            ),
        )
        .with_severity(Severity::Error)])
    }
}
