use std::cmp::Ordering;

use crate::evaluator::MatchCandidate;

/// Total order over matching rules; `Greater` means `a` beats `b`.
///
/// Tiers, each consulted only when the previous one is tied:
/// 1. more aspects
/// 2. regex payee pattern over substring
/// 3. longer payee pattern
/// 4. more recently modified
/// 5. lexicographically smaller rule id
pub fn compare(a: &MatchCandidate<'_>, b: &MatchCandidate<'_>) -> Ordering {
    let (sa, sb) = (&a.specificity, &b.specificity);
    sa.aspect_count
        .cmp(&sb.aspect_count)
        .then(sa.uses_regex.cmp(&sb.uses_regex))
        .then(sa.pattern_length.cmp(&sb.pattern_length))
        .then(a.rule.modified_at.cmp(&b.rule.modified_at))
        .then_with(|| b.rule.id.cmp(&a.rule.id))
}

/// Picks the single winner. `None` only when there are no candidates.
pub fn resolve<'a, I>(candidates: I) -> Option<MatchCandidate<'a>>
where
    I: IntoIterator<Item = MatchCandidate<'a>>,
{
    candidates.into_iter().max_by(compare)
}

/// Sorts candidates best-first.
pub fn rank(candidates: &mut [MatchCandidate<'_>]) {
    candidates.sort_by(|a, b| compare(b, a));
}
