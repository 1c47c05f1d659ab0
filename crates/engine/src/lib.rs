//! Payee matching rule engine.
//!
//! Given a transaction and one tenant's rule snapshot, picks the single most
//! specific matching rule and reports the category it assigns together with
//! the usage statistics the caller should record for it.

pub mod amount;
pub mod batch;
pub mod config;
pub mod engine;
pub mod evaluator;
pub mod pattern;
pub mod resolver;
pub mod validation;

pub use batch::{categorize_batch_parallel, BatchError, BatchReport};
pub use config::{ConfigError, EngineConfig, RuleSet};
pub use engine::{categorize, CategorizationOutcome, RuleEngine, RuleMatch};
pub use evaluator::{evaluate, CompiledRule, MatchCandidate, Specificity};
pub use pattern::{
    BoundedMatcher, CompiledPattern, LinearMatcher, PatternField, RegexLimits, TimedOut,
    DEFAULT_REGEX_BUDGET,
};
pub use validation::{validate_rule, validate_rules};

pub use payee_rules_core::{
    normalize_category, AmountConstraint, MatchableTransaction, Money, Rule, RuleError, RuleId,
    UsageUpdate,
};
