//! End-to-end categorization of TOML-authored rule sets.

use chrono::{DateTime, TimeZone, Utc};
use payee_rules_engine::{
    categorize_batch_parallel, validate_rules, EngineConfig, MatchableTransaction, Money,
    RuleEngine, RuleSet,
};
use std::sync::Arc;

const RULES: &str = r#"
[[rules]]
id = "groceries"
payee_pattern = "Safeway"
category = "Groceries"
modified_at = "2024-01-10T00:00:00Z"
match_count = 12

[[rules]]
id = "bulk-groceries"
payee_pattern = "Safeway"
category = "Bulk Groceries"
amount_min = "100.00"
amount_max = "500.00"
modified_at = "2024-01-11T00:00:00Z"

[[rules]]
id = "shopping"
payee_pattern = "^AMZN.*$"
payee_is_regex = true
category = "Shopping"
modified_at = "2024-01-12T00:00:00Z"

[[rules]]
id = "marketplace"
payee_pattern = "AMZN Mktp"
category = "Amazon Marketplace"
modified_at = "2024-03-01T00:00:00Z"

[[rules]]
id = "cafe-short"
payee_pattern = "Coffee"
category = "Café"
modified_at = "2024-03-01T00:00:00Z"

[[rules]]
id = "cafe-long"
payee_pattern = "Megacorp Coffee"
category = "Café"
modified_at = "2024-01-01T00:00:00Z"

[[rules]]
id = "card-rent"
payee_pattern = "Landlord"
source_pattern = "visa"
amount_exact = "1500.00"
category = "Rent"
modified_at = "2024-01-01T00:00:00Z"
"#;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
}

fn tx(id: i64, payee: &str, amount: &str) -> MatchableTransaction {
    MatchableTransaction::new(id, payee, amount.parse::<Money>().unwrap())
}

fn engine() -> RuleEngine {
    let set = RuleSet::from_toml(RULES).unwrap();
    assert!(validate_rules(&set.rules, &EngineConfig::default()).is_empty());
    RuleEngine::from_rule_set(set, EngineConfig::default())
}

fn category(engine: &RuleEngine, tx: &MatchableTransaction) -> Option<String> {
    engine.categorize(tx, now()).category().map(str::to_string)
}

#[test]
fn more_aspects_win() {
    let engine = engine();
    assert_eq!(
        category(&engine, &tx(1, "Safeway Store #12", "-150.00")).as_deref(),
        Some("Bulk Groceries")
    );
    assert_eq!(
        category(&engine, &tx(2, "Safeway Store #12", "-$500")).as_deref(),
        Some("Bulk Groceries")
    );
    assert_eq!(
        category(&engine, &tx(3, "Safeway Store #12", "-500.01")).as_deref(),
        Some("Groceries")
    );
}

#[test]
fn regex_beats_substring() {
    assert_eq!(
        category(&engine(), &tx(1, "AMZN Mktp US*1A2B3", "-29.99")).as_deref(),
        Some("Shopping")
    );
}

#[test]
fn longer_pattern_beats_newer_rule() {
    let outcome = engine().categorize(&tx(1, "MEGACORP COFFEE 0042", "-4.50"), now());
    assert_eq!(outcome.rule_match().unwrap().rule_id.as_str(), "cafe-long");
}

#[test]
fn source_and_amount_constraints() {
    let engine = engine();
    let on_card = tx(1, "LANDLORD PROPERTY MGMT", "-1,500.00").with_source("Chase Visa");
    assert_eq!(category(&engine, &on_card).as_deref(), Some("Rent"));

    let refunded = tx(2, "LANDLORD PROPERTY MGMT", "1500").with_source("Chase Visa");
    assert_eq!(category(&engine, &refunded).as_deref(), Some("Rent"));

    let from_checking = tx(3, "LANDLORD PROPERTY MGMT", "-1500.00").with_source("Checking");
    assert_eq!(category(&engine, &from_checking), None);
}

#[test]
fn unmatched_payee_produces_no_statistics() {
    let engine = engine();
    let report = engine.categorize_batch(&[tx(1, "Trader Joe's", "-12.00")], now());
    assert_eq!(report.unmatched, 1);
    assert!(report.usage_updates().is_empty());
}

#[tokio::test]
async fn parallel_batch_applies_back_to_rules() {
    let engine = Arc::new(engine());
    let batch = vec![
        tx(1, "Safeway Store #12", "-20.00"),
        tx(2, "Safeway Store #12", "-35.10"),
        tx(3, "AMZN Mktp US", "-9.99"),
        tx(4, "Unknown Vendor", "-1.00"),
    ];
    let report = categorize_batch_parallel(Arc::clone(&engine), batch, now())
        .await
        .unwrap();
    assert_eq!(report.matched, 3);

    let mut rules: Vec<_> = engine.rules().cloned().collect();
    for update in report.usage_updates() {
        for rule in rules.iter_mut() {
            rule.apply_usage(&update);
        }
    }

    let groceries = rules.iter().find(|r| r.id.as_str() == "groceries").unwrap();
    assert_eq!(groceries.match_count, 14);
    assert_eq!(groceries.last_used_at, Some(now()));

    let untouched = rules.iter().find(|r| r.id.as_str() == "bulk-groceries").unwrap();
    assert_eq!(untouched.match_count, 0);
    assert_eq!(untouched.last_used_at, None);
}
