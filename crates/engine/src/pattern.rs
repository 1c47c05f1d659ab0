use regex::{Regex, RegexBuilder};
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Wall-clock budget for a single regex evaluation.
pub const DEFAULT_REGEX_BUDGET: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Pattern evaluation took {elapsed:?}, budget was {budget:?}")]
pub struct TimedOut {
    pub budget: Duration,
    pub elapsed: Duration,
}

/// Compile-time bounds handed to the regex builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegexLimits {
    pub size_limit: usize,
    pub dfa_size_limit: usize,
}

impl Default for RegexLimits {
    fn default() -> Self {
        Self {
            size_limit: 1 << 20,
            dfa_size_limit: 2 << 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternField {
    Payee,
    Source,
}

impl PatternField {
    pub fn as_str(self) -> &'static str {
        match self {
            PatternField::Payee => "payee",
            PatternField::Source => "source",
        }
    }
}

impl fmt::Display for PatternField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rule pattern prepared once per rule-set snapshot.
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Escaped literal searched case-insensitively, unanchored.
    Substring(Regex),
    /// Case-insensitive, anchored at both ends for full-match semantics.
    Regex(Regex),
    /// Regex that failed to compile. Never matches.
    Invalid { pattern: String, message: String },
}

impl CompiledPattern {
    pub fn try_compile(
        pattern: &str,
        is_regex: bool,
        limits: RegexLimits,
    ) -> Result<Self, regex::Error> {
        if !is_regex {
            // Simple per-character folding, same as the regex path.
            let literal = RegexBuilder::new(&regex::escape(pattern))
                .case_insensitive(true)
                .build()?;
            return Ok(CompiledPattern::Substring(literal));
        }
        let re = RegexBuilder::new(&format!("^(?:{pattern})$"))
            .case_insensitive(true)
            .size_limit(limits.size_limit)
            .dfa_size_limit(limits.dfa_size_limit)
            .build()?;
        Ok(CompiledPattern::Regex(re))
    }

    /// Like [`try_compile`](Self::try_compile) but folds a compile failure
    /// into [`CompiledPattern::Invalid`].
    pub fn compile(pattern: &str, is_regex: bool, limits: RegexLimits) -> Self {
        Self::try_compile(pattern, is_regex, limits).unwrap_or_else(|e| {
            CompiledPattern::Invalid {
                pattern: pattern.to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, CompiledPattern::Regex(_) | CompiledPattern::Invalid { .. })
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, CompiledPattern::Invalid { .. })
    }
}

/// Evaluates a compiled pattern against text under a time budget.
pub trait BoundedMatcher: Send + Sync {
    fn try_match(
        &self,
        pattern: &CompiledPattern,
        text: &str,
        budget: Duration,
    ) -> Result<bool, TimedOut>;
}

/// Matcher backed by the `regex` crate, whose automata run in time linear
/// in the input, so no pattern can backtrack catastrophically. Elapsed time
/// is still measured and anything over budget is reported as [`TimedOut`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LinearMatcher;

impl BoundedMatcher for LinearMatcher {
    fn try_match(
        &self,
        pattern: &CompiledPattern,
        text: &str,
        budget: Duration,
    ) -> Result<bool, TimedOut> {
        match pattern {
            CompiledPattern::Substring(literal) => Ok(literal.is_match(text)),
            CompiledPattern::Regex(re) => {
                let start = Instant::now();
                let matched = re.is_match(text);
                let elapsed = start.elapsed();
                if elapsed > budget {
                    return Err(TimedOut { budget, elapsed });
                }
                Ok(matched)
            }
            CompiledPattern::Invalid { .. } => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pattern: &str, is_regex: bool, text: &str) -> bool {
        let compiled = CompiledPattern::compile(pattern, is_regex, RegexLimits::default());
        LinearMatcher
            .try_match(&compiled, text, DEFAULT_REGEX_BUDGET)
            .unwrap()
    }

    #[test]
    fn substring_is_case_insensitive() {
        assert!(check("shop", false, "MEGA SHOP INC"));
        assert!(check("Whole Foods", false, "whole foods market 123"));
    }

    #[test]
    fn substring_tests_containment() {
        assert!(check("Coffee", false, "Megacorp Coffee #4"));
        assert!(!check("Tea", false, "Megacorp Coffee #4"));
    }

    #[test]
    fn substring_folds_non_ascii() {
        assert!(check("CAFÉ", false, "le café du coin"));
    }

    #[test]
    fn substring_matches_greek_final_sigma() {
        assert!(check("Σ", false, "ΟΔΟΣ"));
        assert!(check("ΟΔΟΣ", false, "ΟΔΟΣΑ"));
        assert!(check("οδος", false, "ΟΔΟΣ 12"));
    }

    #[test]
    fn substring_metacharacters_are_literal() {
        assert!(check("US*1A", false, "AMZN Mktp US*1A2B3"));
        assert!(!check("a.c", false, "abc"));
    }

    #[test]
    fn regex_is_case_insensitive() {
        assert!(check("^shop.*$", true, "SHOP 123"));
    }

    #[test]
    fn regex_requires_full_match() {
        // Would be found by a search, but does not cover the whole payee.
        assert!(!check("shop", true, "MEGA SHOP INC"));
        assert!(check(".*shop.*", true, "MEGA SHOP INC"));
    }

    #[test]
    fn regex_alternation_stays_anchored() {
        // Without grouping, `^a|b$` would match any text starting with "a".
        assert!(!check("amzn|amazon", true, "AMZN Mktp US"));
        assert!(check("amzn|amazon", true, "AMAZON"));
    }

    #[test]
    fn empty_regex_only_matches_empty_text() {
        assert!(check("", true, ""));
        assert!(!check("", true, "anything"));
    }

    #[test]
    fn invalid_regex_never_matches() {
        let compiled = CompiledPattern::compile("(unclosed", true, RegexLimits::default());
        assert!(!compiled.is_valid());
        assert!(compiled.is_regex());
        assert_eq!(
            LinearMatcher.try_match(&compiled, "(unclosed", DEFAULT_REGEX_BUDGET),
            Ok(false)
        );
    }

    #[test]
    fn try_compile_surfaces_error() {
        assert!(CompiledPattern::try_compile("[a-", true, RegexLimits::default()).is_err());
        assert!(CompiledPattern::try_compile("[a-", false, RegexLimits::default()).is_ok());
    }

    #[test]
    fn size_limit_rejects_huge_patterns() {
        let limits = RegexLimits {
            size_limit: 1024,
            dfa_size_limit: 1024,
        };
        assert!(CompiledPattern::try_compile(r"\w{500}", true, limits).is_err());
    }

    #[test]
    fn classic_redos_pattern_completes_quickly() {
        let compiled = CompiledPattern::compile("(a+)+b", true, RegexLimits::default());
        let input = "a".repeat(2_000);
        let start = Instant::now();
        let result = LinearMatcher.try_match(&compiled, &input, DEFAULT_REGEX_BUDGET);
        assert_eq!(result, Ok(false));
        assert!(start.elapsed() < DEFAULT_REGEX_BUDGET);
    }

    #[test]
    fn zero_budget_reports_timeout_for_regex_only() {
        let regex = CompiledPattern::compile(".*y", true, RegexLimits::default());
        let text = "x".repeat(200_000);
        // Scanning this much text always takes measurable time.
        let timed_out = LinearMatcher
            .try_match(&regex, &text, Duration::ZERO)
            .unwrap_err();
        assert_eq!(timed_out.budget, Duration::ZERO);
        assert!(timed_out.elapsed > Duration::ZERO);

        let substring = CompiledPattern::compile("x", false, RegexLimits::default());
        assert_eq!(
            LinearMatcher.try_match(&substring, &text, Duration::ZERO),
            Ok(true)
        );
    }
}
