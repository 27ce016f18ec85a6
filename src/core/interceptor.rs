//! Convention-mode interceptor rules.
//!
//! Rules are only consulted for requests that matched no explicit route.
//! They run in registration order and the first one producing a view ends
//! resolution.
use std::sync::Arc;

use crate::core::{request::RequestContext, view::View};

/// A pre-resolution check that may claim an unmapped request.
pub trait InterceptorRule: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Evaluate the rule; `Some(view)` short-circuits convention resolution.
    fn evaluate(&self, ctx: &RequestContext) -> Option<View>;
}

/// Ordered list of interceptor rules. Never re-sorted after registration.
#[derive(Default)]
pub struct InterceptorRuleEngine {
    rules: Vec<Arc<dyn InterceptorRule>>,
}

impl InterceptorRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, rule: Arc<dyn InterceptorRule>) {
        tracing::debug!(rule = rule.name(), "Registered interceptor rule");
        self.rules.push(rule);
    }

    pub fn evaluate(&self, ctx: &RequestContext) -> Option<View> {
        self.rules.iter().find_map(|rule| {
            let view = rule.evaluate(ctx)?;
            tracing::debug!(
                rule = rule.name(),
                path = ctx.path(),
                %view,
                "Interceptor rule matched"
            );
            Some(view)
        })
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Path pattern of a [`PatternRule`]: exact path, or prefix when written with a trailing `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulePattern {
    Exact(String),
    Prefix(String),
}

impl RulePattern {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().strip_suffix('*') {
            Some(prefix) => RulePattern::Prefix(prefix.to_string()),
            None => RulePattern::Exact(raw.trim().to_string()),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            RulePattern::Exact(exact) => path == exact,
            RulePattern::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

/// Exemption that keeps a [`PatternRule`] from firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleGuard {
    /// Skip the rule when the request carries this header.
    UnlessHeader(String),
    /// Skip the rule when the request carries this parameter.
    UnlessParam(String),
}

/// Declarative rule: when the path matches and no guard exempts the
/// request, answer with a fixed view.
#[derive(Debug, Clone)]
pub struct PatternRule {
    name: String,
    pattern: RulePattern,
    guards: Vec<RuleGuard>,
    view: View,
}

impl PatternRule {
    pub fn new(name: impl Into<String>, pattern: &str, view: View) -> Self {
        Self {
            name: name.into(),
            pattern: RulePattern::parse(pattern),
            guards: Vec::new(),
            view,
        }
    }

    pub fn guard(mut self, guard: RuleGuard) -> Self {
        self.guards.push(guard);
        self
    }

    fn exempt(&self, ctx: &RequestContext) -> bool {
        self.guards.iter().any(|guard| match guard {
            RuleGuard::UnlessHeader(name) => ctx.header(name).is_some(),
            RuleGuard::UnlessParam(name) => ctx.request().has_param(name),
        })
    }
}

impl InterceptorRule for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, ctx: &RequestContext) -> Option<View> {
        if self.pattern.matches(ctx.path()) && !self.exempt(ctx) {
            Some(self.view.clone())
        } else {
            None
        }
    }
}
