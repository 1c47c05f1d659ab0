use payee_rules_core::{AmountConstraint, MatchableTransaction, Rule};
use std::time::Duration;

use crate::amount;
use crate::pattern::{BoundedMatcher, CompiledPattern, PatternField, RegexLimits};

/// Pairing of a rule with its precompiled patterns.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: Rule,
    payee: CompiledPattern,
    source: Option<CompiledPattern>,
    amount: Option<AmountConstraint>,
}

impl CompiledRule {
    pub fn compile(rule: Rule, limits: RegexLimits) -> Self {
        let payee = CompiledPattern::compile(&rule.payee_pattern, rule.payee_is_regex, limits);
        warn_if_invalid(&rule, PatternField::Payee, &payee);

        let source = rule.source_pattern.as_deref().map(|pattern| {
            let compiled = CompiledPattern::compile(pattern, rule.source_is_regex, limits);
            warn_if_invalid(&rule, PatternField::Source, &compiled);
            compiled
        });

        let amount = rule.amount_constraint();
        Self {
            rule,
            payee,
            source,
            amount,
        }
    }
}

fn warn_if_invalid(rule: &Rule, field: PatternField, compiled: &CompiledPattern) {
    if let CompiledPattern::Invalid { pattern, message } = compiled {
        tracing::warn!(
            rule_id = %rule.id,
            %field,
            pattern = %pattern,
            "Skipping rule with invalid regex: {message}"
        );
    }
}

/// Tie-break inputs computed for a rule that matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specificity {
    /// 1 (payee) plus one each for a source and an amount constraint.
    pub aspect_count: u8,
    /// Whether the payee pattern is a regex. The source pattern's kind is not considered.
    pub uses_regex: bool,
    /// Payee pattern length in characters.
    pub pattern_length: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct MatchCandidate<'a> {
    pub rule: &'a Rule,
    pub specificity: Specificity,
}

/// Decides whether one rule applies to a transaction.
///
/// Payee is checked first and is the only mandatory dimension; source and
/// amount are checked only when the rule constrains them. A pattern that
/// times out or failed to compile counts as "does not match".
pub fn evaluate<'a, M>(
    compiled: &'a CompiledRule,
    tx: &MatchableTransaction,
    matcher: &M,
    budget: Duration,
) -> Option<MatchCandidate<'a>>
where
    M: BoundedMatcher + ?Sized,
{
    let rule = &compiled.rule;

    let payee = &compiled.payee;
    if !pattern_matches(rule, PatternField::Payee, payee, &tx.payee, matcher, budget) {
        return None;
    }

    if let Some(source_pattern) = &compiled.source {
        // A transaction with no source text cannot satisfy a source constraint.
        let source_text = tx.source.as_deref()?;
        let field = PatternField::Source;
        if !pattern_matches(rule, field, source_pattern, source_text, matcher, budget) {
            return None;
        }
    }

    if !amount::matches(compiled.amount, tx.amount) {
        return None;
    }

    let aspect_count =
        1 + u8::from(compiled.source.is_some()) + u8::from(compiled.amount.is_some());

    Some(MatchCandidate {
        rule,
        specificity: Specificity {
            aspect_count,
            uses_regex: rule.payee_is_regex,
            pattern_length: rule.payee_pattern.chars().count(),
        },
    })
}

fn pattern_matches<M>(
    rule: &Rule,
    field: PatternField,
    pattern: &CompiledPattern,
    text: &str,
    matcher: &M,
    budget: Duration,
) -> bool
where
    M: BoundedMatcher + ?Sized,
{
    match matcher.try_match(pattern, text, budget) {
        Ok(matched) => matched,
        Err(timed_out) => {
            tracing::warn!(
                rule_id = %rule.id,
                %field,
                elapsed_ms = timed_out.elapsed.as_millis() as u64,
                budget_ms = timed_out.budget.as_millis() as u64,
                "Regex exceeded its time budget; treating rule as non-matching"
            );
            false
        }
    }
}
