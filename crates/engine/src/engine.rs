use chrono::{DateTime, Utc};
use payee_rules_core::{MatchableTransaction, Rule, RuleId, UsageUpdate};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EngineConfig, RuleSet};
use crate::evaluator::{evaluate, CompiledRule, MatchCandidate};
use crate::pattern::{BoundedMatcher, LinearMatcher};
use crate::resolver;

/// Winning rule for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub transaction_id: i64,
    pub rule_id: RuleId,
    pub category: String,
    /// Statistics to record for the winning rule only.
    pub usage: UsageUpdate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategorizationOutcome {
    Matched(RuleMatch),
    NoMatch,
}

impl CategorizationOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, CategorizationOutcome::Matched(_))
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            CategorizationOutcome::Matched(m) => Some(&m.category),
            CategorizationOutcome::NoMatch => None,
        }
    }

    pub fn rule_match(&self) -> Option<&RuleMatch> {
        match self {
            CategorizationOutcome::Matched(m) => Some(m),
            CategorizationOutcome::NoMatch => None,
        }
    }
}

/// Immutable, compiled snapshot of one tenant's rules.
///
/// Patterns are compiled once here and reused for every transaction, so a
/// single engine is meant to be built per batch and shared (it is `Sync`).
pub struct RuleEngine<M = LinearMatcher> {
    rules: Vec<CompiledRule>,
    config: EngineConfig,
    matcher: M,
}

impl RuleEngine<LinearMatcher> {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self::with_config(rules, EngineConfig::default())
    }

    pub fn with_config(rules: Vec<Rule>, config: EngineConfig) -> Self {
        Self::with_matcher(rules, config, LinearMatcher)
    }

    pub fn from_rule_set(set: RuleSet, config: EngineConfig) -> Self {
        Self::with_config(set.rules, config)
    }
}

impl<M: BoundedMatcher> RuleEngine<M> {
    pub fn with_matcher(rules: Vec<Rule>, config: EngineConfig, matcher: M) -> Self {
        let limits = config.regex_limits();
        let rules = rules
            .into_iter()
            .map(|rule| CompiledRule::compile(rule, limits))
            .collect();
        Self {
            rules,
            config,
            matcher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(|cr| &cr.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn budget(&self) -> Duration {
        self.config.regex_budget()
    }

    /// Every rule that matches `tx`, in rule-set order.
    pub fn candidates(&self, tx: &MatchableTransaction) -> Vec<MatchCandidate<'_>> {
        let budget = self.budget();
        self.rules
            .iter()
            .filter_map(|cr| evaluate(cr, tx, &self.matcher, budget))
            .collect()
    }

    /// Every matching rule ranked best-first; the first entry is the one
    /// [`categorize`](Self::categorize) would pick.
    pub fn explain(&self, tx: &MatchableTransaction) -> Vec<MatchCandidate<'_>> {
        let mut candidates = self.candidates(tx);
        resolver::rank(&mut candidates);
        candidates
    }

    pub fn categorize(
        &self,
        tx: &MatchableTransaction,
        now: DateTime<Utc>,
    ) -> CategorizationOutcome {
        let candidates = self.candidates(tx);
        let considered = candidates.len();

        let Some(winner) = resolver::resolve(candidates) else {
            tracing::debug!(transaction_id = tx.id, "No rule matched");
            return CategorizationOutcome::NoMatch;
        };

        let rule = winner.rule;
        tracing::debug!(
            transaction_id = tx.id,
            rule_id = %rule.id,
            category = %rule.category,
            aspects = winner.specificity.aspect_count,
            candidates = considered,
            "Rule matched"
        );

        CategorizationOutcome::Matched(RuleMatch {
            transaction_id: tx.id,
            rule_id: rule.id.clone(),
            category: rule.category.clone(),
            usage: rule.usage_after(1, now),
        })
    }
}

/// One-shot categorization against an uncompiled rule slice.
///
/// Compiles `rules` on every call, so an invalid regex is warned about once
/// per call rather than once per snapshot. Build a [`RuleEngine`] when
/// categorizing more than one transaction.
pub fn categorize(
    transaction: &MatchableTransaction,
    rules: &[Rule],
    now: DateTime<Utc>,
) -> CategorizationOutcome {
    RuleEngine::new(rules.to_vec()).categorize(transaction, now)
}
