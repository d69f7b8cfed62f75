/// Word budgets never shrink below this, however short the target.
pub const MIN_BUDGET_WORDS: usize = 35;

pub const ELLIPSIS: &str = "…";

/// Narration text after it has been fitted to the requested duration.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimmedNarration {
    pub text: String,
    pub estimated_duration_seconds: f64,
}

impl TrimmedNarration {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DurationEstimator {
    words_per_second: f64,
}

impl Default for DurationEstimator {
    fn default() -> Self {
        Self::new(2.2)
    }
}

impl DurationEstimator {
    pub fn new(words_per_second: f64) -> Self {
        Self { words_per_second }
    }

    /// `ceil(words / rate)`, counting at least one word so the result is never 0.
    pub fn estimate_speaking_seconds(&self, text: &str) -> u32 {
        let words = text.split_whitespace().count().max(1);
        (words as f64 / self.words_per_second).ceil() as u32
    }

    pub fn max_words(&self, target_seconds: u32) -> usize {
        let budget = (target_seconds as f64 * self.words_per_second).floor() as usize;
        budget.max(MIN_BUDGET_WORDS)
    }

    pub fn trim_to_budget(&self, text: &str, target_seconds: u32) -> String {
        let max_words = self.max_words(target_seconds);
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() <= max_words {
            return text.trim().to_string();
        }
        let mut out = words[..max_words].join(" ");
        out.push_str(ELLIPSIS);
        out
    }

    pub fn trim(&self, text: &str, target_seconds: u32) -> TrimmedNarration {
        let text = self.trim_to_budget(text, target_seconds);
        let estimated_duration_seconds = self.estimate_speaking_seconds(&text) as f64;
        TrimmedNarration {
            text,
            estimated_duration_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn estimate_is_at_least_one_second() {
        let est = DurationEstimator::default();
        assert_eq!(est.estimate_speaking_seconds(""), 1);
        assert_eq!(est.estimate_speaking_seconds("   "), 1);
        assert_eq!(est.estimate_speaking_seconds("hello"), 1);
    }

    #[test]
    fn estimate_is_monotonic_in_word_count() {
        let est = DurationEstimator::default();
        let mut previous = 0;
        for n in 0..300 {
            let secs = est.estimate_speaking_seconds(&words(n));
            assert!(secs >= previous, "{n} words went from {previous}s to {secs}s");
            previous = secs;
        }
        assert_eq!(est.estimate_speaking_seconds(&words(10)), 5);
        assert_eq!(est.estimate_speaking_seconds(&words(23)), 11);
    }

    #[test]
    fn short_text_is_returned_unchanged() {
        let est = DurationEstimator::default();
        let body = "Six Sigma reduces variation through DMAIC.";
        assert_eq!(est.trim_to_budget(body, 30), body);
        assert_eq!(est.trim_to_budget("  padded  ", 30), "padded");
    }

    #[test]
    fn long_text_is_cut_to_budget_with_ellipsis() {
        let est = DurationEstimator::default();
        let out = est.trim_to_budget(&words(500), 30);
        assert_eq!(est.max_words(30), 66);
        assert_eq!(out.split_whitespace().count(), 66);
        assert!(out.starts_with("w0 w1 w2"));
        assert!(out.ends_with("w65…"));
    }

    #[test]
    fn budget_never_drops_below_floor() {
        let est = DurationEstimator::new(0.5);
        assert_eq!(est.max_words(30), MIN_BUDGET_WORDS);
    }

    #[test]
    fn budget_holds_for_every_target_and_trimming_is_idempotent() {
        let est = DurationEstimator::default();
        let body = words(400);
        for target in 30..=90 {
            let limit = MIN_BUDGET_WORDS.max((target as f64 * 2.2).floor() as usize);
            let once = est.trim_to_budget(&body, target);
            assert!(once.split_whitespace().count() <= limit);
            assert_eq!(est.trim_to_budget(&once, target), once);
        }
    }

    #[test]
    fn trim_carries_estimate() {
        let est = DurationEstimator::default();
        let trimmed = est.trim(&words(45), 60);
        assert_eq!(trimmed.word_count(), 45);
        assert!((trimmed.estimated_duration_seconds - 21.0).abs() < f64::EPSILON);
    }
}
