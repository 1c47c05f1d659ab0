pub mod money;
pub mod rule;
pub mod transaction;

pub use money::Money;
pub use rule::{normalize_category, AmountConstraint, Rule, RuleError, RuleId, UsageUpdate};
pub use transaction::MatchableTransaction;
