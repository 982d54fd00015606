// Token counting for prompt budgets

/// Counts tokens of a message for some target model
pub trait TokenCounter {
    fn count(&self, text: &str) -> usize;
}

/// Character-based estimate: about four characters per token.
///
/// Stands in for a model tokenizer; counts round up so a non-empty text is
/// never zero tokens.
#[derive(Debug, Clone, Copy)]
pub struct ApproxTokenCounter {
    chars_per_token: usize,
}

impl ApproxTokenCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for ApproxTokenCounter {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_count() {
        let counter = ApproxTokenCounter::default();
        assert_eq!(counter.count(""), 0);
        assert_eq!(counter.count("a"), 1);
        assert_eq!(counter.count("abcd"), 1);
        assert_eq!(counter.count("abcde"), 2);
        // Characters, not bytes
        assert_eq!(counter.count("ééééé"), 2);
    }

    #[test]
    fn test_zero_ratio_clamped() {
        let counter = ApproxTokenCounter::new(0);
        assert_eq!(counter.count("abc"), 3);
    }
}
