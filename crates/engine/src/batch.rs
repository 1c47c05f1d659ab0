use chrono::{DateTime, Utc};
use payee_rules_core::{MatchableTransaction, RuleId, UsageUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::engine::{CategorizationOutcome, RuleEngine};
use crate::pattern::BoundedMatcher;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Categorization worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Outcomes for a batch, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<CategorizationOutcome>,
    pub matched: usize,
    pub unmatched: usize,
}

impl BatchReport {
    fn from_outcomes(outcomes: Vec<CategorizationOutcome>) -> Self {
        let matched = outcomes.iter().filter(|o| o.is_match()).count();
        let unmatched = outcomes.len() - matched;
        Self {
            outcomes,
            matched,
            unmatched,
        }
    }

    /// Folds every win in the batch into one delta per rule, ordered by rule id.
    ///
    /// Each outcome's delta was computed against the same snapshot, so a rule
    /// that won `n` times ends at `snapshot_count + n`, not `snapshot_count + 1`.
    pub fn usage_updates(&self) -> Vec<UsageUpdate> {
        let mut folded: BTreeMap<&RuleId, (UsageUpdate, u64)> = BTreeMap::new();
        for m in self.outcomes.iter().filter_map(|o| o.rule_match()) {
            folded
                .entry(&m.rule_id)
                .and_modify(|(update, wins)| {
                    *wins += 1;
                    update.last_used_at = update.last_used_at.max(m.usage.last_used_at);
                })
                .or_insert_with(|| (m.usage.clone(), 1));
        }
        folded
            .into_values()
            .map(|(mut update, wins)| {
                update.match_count = update.match_count.saturating_add(wins - 1);
                update
            })
            .collect()
    }
}

impl<M: BoundedMatcher> RuleEngine<M> {
    /// Categorizes a batch on the current thread.
    pub fn categorize_batch(
        &self,
        transactions: &[MatchableTransaction],
        now: DateTime<Utc>,
    ) -> BatchReport {
        let outcomes = transactions
            .iter()
            .map(|tx| self.categorize(tx, now))
            .collect();
        let report = BatchReport::from_outcomes(outcomes);
        tracing::info!(
            transactions = transactions.len(),
            matched = report.matched,
            unmatched = report.unmatched,
            "Categorized batch"
        );
        report
    }
}

/// Categorizes a batch across tokio's blocking pool. Each worker evaluates a
/// contiguous chunk against the shared snapshot; results keep input order.
pub async fn categorize_batch_parallel<M>(
    engine: Arc<RuleEngine<M>>,
    transactions: Vec<MatchableTransaction>,
    now: DateTime<Utc>,
) -> Result<BatchReport, BatchError>
where
    M: BoundedMatcher + 'static,
{
    let total = transactions.len();
    let chunk_size = engine.config().batch_chunk_size.max(1);

    let mut handles = Vec::with_capacity(total.div_ceil(chunk_size));
    for chunk in transactions.chunks(chunk_size) {
        let chunk = chunk.to_vec();
        let engine = Arc::clone(&engine);
        handles.push(tokio::task::spawn_blocking(move || {
            chunk
                .iter()
                .map(|tx| engine.categorize(tx, now))
                .collect::<Vec<_>>()
        }));
    }

    let mut outcomes = Vec::with_capacity(total);
    for handle in handles {
        outcomes.extend(handle.await?);
    }

    let report = BatchReport::from_outcomes(outcomes);
    tracing::info!(
        transactions = total,
        workers = total.div_ceil(chunk_size),
        matched = report.matched,
        unmatched = report.unmatched,
        "Categorized batch in parallel"
    );
    Ok(report)
}
