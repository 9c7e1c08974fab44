use regex::Regex;

use crate::models::entry::Entry;
use crate::models::rule::{RewriteConfig, RewriteRule};

use super::context::TemplateContext;
use super::functions::FunctionTable;
use super::template::Template;

/// Result of trying one rule against one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Matched(String),
    NoMatch,
}

impl RuleOutcome {
    pub fn into_key(self, original_key: &str) -> String {
        match self {
            RuleOutcome::Matched(key) => key,
            RuleOutcome::NoMatch => original_key.to_string(),
        }
    }
}

/// A rule with its pattern and template prepared once. Either half may be
/// missing when it failed to build, in which case the rule never matches.
#[derive(Debug)]
struct CompiledRule {
    rule: RewriteRule,
    pattern: Option<Regex>,
    template: Option<Template>,
}

impl CompiledRule {
    fn compile(rule: RewriteRule, functions: &FunctionTable) -> Self {
        let pattern = Regex::new(&rule.pattern)
            .inspect_err(|e| {
                tracing::warn!(
                    bucket = %rule.bucket,
                    pattern = %rule.pattern,
                    error = %e,
                    "Rewrite rule pattern does not compile; rule disabled"
                );
            })
            .ok();
        let template = Template::parse(&rule.template, functions)
            .inspect_err(|e| {
                tracing::warn!(
                    bucket = %rule.bucket,
                    template = %rule.template,
                    error = %e,
                    "Rewrite rule template does not parse; rule disabled"
                );
            })
            .ok();
        Self {
            rule,
            pattern,
            template,
        }
    }

    fn apply(&self, functions: &FunctionTable, entry: &Entry, original_key: &str) -> RuleOutcome {
        let (Some(pattern), Some(template)) = (&self.pattern, &self.template) else {
            return RuleOutcome::NoMatch;
        };
        if !pattern.is_match(original_key) {
            return RuleOutcome::NoMatch;
        }
        let ctx = TemplateContext::new(entry, original_key);
        match template.execute(&ctx, functions) {
            Ok(rendered) => RuleOutcome::Matched(finish_key(&rendered)),
            Err(e) => {
                tracing::debug!(
                    bucket = %self.rule.bucket,
                    key = %original_key,
                    error = %e,
                    "Rewrite template failed; trying next rule"
                );
                RuleOutcome::NoMatch
            }
        }
    }
}

/// Trim surrounding whitespace and one leading separator.
fn finish_key(rendered: &str) -> String {
    let trimmed = rendered.trim();
    trimmed.strip_prefix('/').unwrap_or(trimmed).to_string()
}

/// Derives presented object keys from entry metadata.
///
/// Rules are ordered by descending priority (ties keep document order) and
/// the first rule whose scope and pattern match decides the key. Any rule
/// that fails to compile, parse or execute counts as not matching, so
/// `rewrite` always produces a key.
#[derive(Debug)]
pub struct RewriteEngine {
    rules: Vec<CompiledRule>,
    functions: FunctionTable,
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self::new(&RewriteConfig::default())
    }
}

impl RewriteEngine {
    pub fn new(config: &RewriteConfig) -> Self {
        Self::with_functions(config, FunctionTable::standard())
    }

    pub fn with_functions(config: &RewriteConfig, functions: FunctionTable) -> Self {
        let mut ordered = config.rules.clone();
        // sort_by is stable
        ordered.sort_by(|a, b| b.priority.cmp(&a.priority));
        let rules = ordered
            .into_iter()
            .map(|rule| CompiledRule::compile(rule, &functions))
            .collect();
        Self { rules, functions }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rewrite(&self, entry: &Entry, original_key: &str, bucket: &str) -> String {
        self.evaluate(entry, original_key, bucket)
            .into_key(original_key)
    }

    /// First-match fold over the ordered rules.
    pub fn evaluate(&self, entry: &Entry, original_key: &str, bucket: &str) -> RuleOutcome {
        self.rules
            .iter()
            .filter(|compiled| compiled.rule.applies_to(bucket))
            .fold(RuleOutcome::NoMatch, |outcome, compiled| match outcome {
                RuleOutcome::NoMatch => compiled.apply(&self.functions, entry, original_key),
                matched => matched,
            })
    }
}
