use serde::{Deserialize, Serialize};

use super::money::Money;

/// Read-only view of a transaction as the rule engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchableTransaction {
    pub id: i64,
    pub payee: String,
    #[serde(default)]
    pub source: Option<String>,
    /// Signed; matching only ever looks at the magnitude.
    pub amount: Money,
}

impl MatchableTransaction {
    pub fn new(id: i64, payee: &str, amount: Money) -> Self {
        MatchableTransaction {
            id,
            payee: payee.to_string(),
            source: None,
            amount,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }

    pub fn magnitude(&self) -> Money {
        self.amount.abs()
    }
}
