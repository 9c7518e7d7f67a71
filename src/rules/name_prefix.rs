//! Resource and data-source names must carry the provider-name prefix,
//! e.g. `widget_server` for provider `widget`.

use crate::rule::{Issue, LintContext, ProviderRule, RuleResult};
use crate::schema::Provider;

pub struct ResourceNamePrefix;

impl ProviderRule for ResourceNamePrefix {
    fn check_provider(&self, _ctx: &LintContext<'_>, provider: &Provider) -> RuleResult {
        if provider.name.is_empty() {
            return Ok(Vec::new());
        }
        let prefix = format!("{}_", provider.name);

        let mut issues = Vec::new();
        for res in provider.resources.iter().chain(provider.data_sources.iter()) {
            if !res.name.starts_with(&prefix) {
                issues.push(Issue::at(
                    res.pos.clone(),
                    format!(
                        "{} {:?} is not prefixed with the provider name ({:?})",
                        res.kind, res.name, prefix
                    ),
                ));
            }
        }
        Ok(issues)
    }
}
