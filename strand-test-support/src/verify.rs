//! Verification of consumed sequence values.

/// Outcome of checking one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckResult {
    /// Exactly the expected next value
    InOrder,
    /// Values were skipped; holds how many are missing
    Gap(u64),
    /// Value was already seen or is older than the last one
    Regression,
}

/// Expects a strictly increasing, gapless stream `start, start + 1, ...`
#[derive(Debug, Clone)]
pub struct SequenceChecker {
    expected: u64,
    received: u64,
    gaps: u64,
    missing: u64,
    regressions: u64,
}

impl SequenceChecker {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    pub fn starting_at(start: u64) -> Self {
        Self {
            expected: start,
            received: 0,
            gaps: 0,
            missing: 0,
            regressions: 0,
        }
    }

    pub fn check(&mut self, value: u64) -> CheckResult {
        self.received += 1;

        if value == self.expected {
            self.expected += 1;
            CheckResult::InOrder
        } else if value > self.expected {
            let missing = value - self.expected;
            self.gaps += 1;
            self.missing += missing;
            self.expected = value + 1;
            CheckResult::Gap(missing)
        } else {
            self.regressions += 1;
            CheckResult::Regression
        }
    }

    /// Next value this checker expects
    pub fn expected_next(&self) -> u64 {
        self.expected
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn gaps(&self) -> u64 {
        self.gaps
    }

    /// Total values skipped across all gaps
    pub fn missing(&self) -> u64 {
        self.missing
    }

    pub fn regressions(&self) -> u64 {
        self.regressions
    }

    pub fn is_clean(&self) -> bool {
        self.gaps == 0 && self.regressions == 0
    }
}

impl Default for SequenceChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_stream() {
        let mut checker = SequenceChecker::new();
        for value in 0..100 {
            assert_eq!(checker.check(value), CheckResult::InOrder);
        }
        assert!(checker.is_clean());
        assert_eq!(checker.expected_next(), 100);
    }

    #[test]
    fn test_detects_gap_and_regression() {
        let mut checker = SequenceChecker::starting_at(10);
        checker.check(10);
        assert_eq!(checker.check(14), CheckResult::Gap(3));
        assert_eq!(checker.check(12), CheckResult::Regression);
        assert_eq!(checker.check(15), CheckResult::InOrder);

        assert!(!checker.is_clean());
        assert_eq!(checker.gaps(), 1);
        assert_eq!(checker.missing(), 3);
        assert_eq!(checker.regressions(), 1);
        assert_eq!(checker.received(), 4);
    }
}
