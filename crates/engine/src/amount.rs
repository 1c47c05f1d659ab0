use payee_rules_core::{AmountConstraint, Money};

/// Checks a rule's amount dimension against a transaction amount.
/// Only the magnitude of `amount` is considered; range bounds are inclusive
/// and a missing bound leaves that side open. No constraint always matches.
pub fn matches(constraint: Option<AmountConstraint>, amount: Money) -> bool {
    let magnitude = amount.abs();
    match constraint {
        None => true,
        Some(AmountConstraint::Exact(exact)) => magnitude == exact,
        Some(AmountConstraint::Range { min, max }) => {
            let above_min = min.map_or(true, |min| magnitude >= min);
            let below_max = max.map_or(true, |max| magnitude <= max);
            above_min && below_max
        }
    }
}
