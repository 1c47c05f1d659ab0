use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::money::Money;

/// Opaque rule identifier, unique within one tenant's rule set.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        RuleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-authored categorization rule.
///
/// Payee is always constrained; source and amount are optional extra
/// dimensions ("aspects"). `amount_exact` and the `amount_min`/`amount_max`
/// range are mutually exclusive at authoring time, but if both are present
/// the exact value wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub payee_pattern: String,
    #[serde(default)]
    pub payee_is_regex: bool,
    #[serde(default)]
    pub source_pattern: Option<String>,
    #[serde(default)]
    pub source_is_regex: bool,
    #[serde(default)]
    pub amount_exact: Option<Money>,
    #[serde(default)]
    pub amount_min: Option<Money>,
    #[serde(default)]
    pub amount_max: Option<Money>,
    pub category: String,
    /// Last time the rule was added or edited. Later wins ties.
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub match_count: u64,
}

/// Effective amount dimension of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountConstraint {
    Exact(Money),
    Range {
        min: Option<Money>,
        max: Option<Money>,
    },
}

/// Statistics delta for the winning rule, applied by the caller's store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageUpdate {
    pub rule_id: RuleId,
    pub match_count: u64,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Payee pattern must not be empty")]
    EmptyPayeePattern,
    #[error("Source pattern must not be empty when present")]
    EmptySourcePattern,
    #[error("Category must not be empty")]
    EmptyCategory,
    #[error("Category is not normalized: {0:?}")]
    CategoryNotNormalized(String),
    #[error("Amount must not be negative: {0}")]
    NegativeAmount(Money),
    #[error("Amount range is inverted: min={0}, max={1}")]
    InvertedRange(Money, Money),
    #[error("Rule has both an exact amount and an amount range")]
    ConflictingAmountConstraints,
    #[error("Invalid {field} regex: {message}")]
    InvalidRegex {
        field: &'static str,
        message: String,
    },
}

impl Rule {
    /// Payee-only substring rule, the common case.
    pub fn new(
        id: impl Into<String>,
        payee_pattern: &str,
        category: &str,
        modified_at: DateTime<Utc>,
    ) -> Self {
        Rule {
            id: RuleId::new(id),
            payee_pattern: payee_pattern.to_string(),
            payee_is_regex: false,
            source_pattern: None,
            source_is_regex: false,
            amount_exact: None,
            amount_min: None,
            amount_max: None,
            category: normalize_category(category),
            modified_at,
            last_used_at: None,
            match_count: 0,
        }
    }

    pub fn amount_constraint(&self) -> Option<AmountConstraint> {
        if let Some(exact) = self.amount_exact {
            return Some(AmountConstraint::Exact(exact));
        }
        if self.amount_min.is_some() || self.amount_max.is_some() {
            return Some(AmountConstraint::Range {
                min: self.amount_min,
                max: self.amount_max,
            });
        }
        None
    }

    pub fn has_source(&self) -> bool {
        self.source_pattern.is_some()
    }

    /// Number of aspects this rule constrains: payee, plus source and amount when present.
    pub fn aspect_count(&self) -> u8 {
        1 + u8::from(self.has_source()) + u8::from(self.amount_constraint().is_some())
    }

    pub fn is_payee_only(&self) -> bool {
        self.aspect_count() == 1
    }

    /// The delta to record when this rule wins `wins` transactions at `now`.
    pub fn usage_after(&self, wins: u64, now: DateTime<Utc>) -> UsageUpdate {
        UsageUpdate {
            rule_id: self.id.clone(),
            match_count: self.match_count.saturating_add(wins),
            last_used_at: now,
        }
    }

    /// Caller-side application of an engine-produced delta. Ignores deltas
    /// addressed to a different rule.
    pub fn apply_usage(&mut self, update: &UsageUpdate) -> bool {
        if update.rule_id != self.id {
            return false;
        }
        self.match_count = update.match_count;
        self.last_used_at = Some(update.last_used_at);
        true
    }
}

/// Trims and collapses internal whitespace runs to a single space.
pub fn normalize_category(category: &str) -> String {
    category.split_whitespace().collect::<Vec<_>>().join(" ")
}
