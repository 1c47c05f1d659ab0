use payee_rules_core::{normalize_category, Rule, RuleError, RuleId};

use crate::config::EngineConfig;
use crate::pattern::{CompiledPattern, PatternField};

/// Authoring-time checks for a single rule. The evaluation path never calls
/// this; it only degrades gracefully when a rule that would fail here slips
/// through.
pub fn validate_rule(rule: &Rule, config: &EngineConfig) -> Result<(), RuleError> {
    if rule.payee_pattern.trim().is_empty() {
        return Err(RuleError::EmptyPayeePattern);
    }
    if let Some(source) = &rule.source_pattern {
        if source.trim().is_empty() {
            return Err(RuleError::EmptySourcePattern);
        }
    }

    if rule.category.trim().is_empty() {
        return Err(RuleError::EmptyCategory);
    }
    if normalize_category(&rule.category) != rule.category {
        return Err(RuleError::CategoryNotNormalized(rule.category.clone()));
    }

    validate_amounts(rule)?;

    check_regex(&rule.payee_pattern, rule.payee_is_regex, PatternField::Payee, config)?;
    if let Some(source) = &rule.source_pattern {
        check_regex(source, rule.source_is_regex, PatternField::Source, config)?;
    }

    Ok(())
}

/// Validates every rule, returning the failures in rule-set order.
pub fn validate_rules(rules: &[Rule], config: &EngineConfig) -> Vec<(RuleId, RuleError)> {
    rules
        .iter()
        .filter_map(|rule| {
            validate_rule(rule, config)
                .err()
                .map(|e| (rule.id.clone(), e))
        })
        .collect()
}

fn validate_amounts(rule: &Rule) -> Result<(), RuleError> {
    for amount in [rule.amount_exact, rule.amount_min, rule.amount_max]
        .into_iter()
        .flatten()
    {
        if amount.is_negative() {
            return Err(RuleError::NegativeAmount(amount));
        }
    }

    let has_range = rule.amount_min.is_some() || rule.amount_max.is_some();
    if rule.amount_exact.is_some() && has_range {
        return Err(RuleError::ConflictingAmountConstraints);
    }

    if let (Some(min), Some(max)) = (rule.amount_min, rule.amount_max) {
        if min > max {
            return Err(RuleError::InvertedRange(min, max));
        }
    }
    Ok(())
}

fn check_regex(
    pattern: &str,
    is_regex: bool,
    field: PatternField,
    config: &EngineConfig,
) -> Result<(), RuleError> {
    CompiledPattern::try_compile(pattern, is_regex, config.regex_limits())
        .map(|_| ())
        .map_err(|e| RuleError::InvalidRegex {
            field: field.as_str(),
            message: e.to_string(),
        })
}
