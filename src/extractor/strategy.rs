//! Ordered fallback strategies for facet extraction.
//!
//! Upstream markup is not contractually stable, so each facet is read by a
//! chain of strategies tried in priority order. The first strategy that
//! yields a non-empty value wins; adding a new fallback selector means adding
//! one more link to the chain.

use scraper::ElementRef;

use crate::models::Pronunciations;

/// Values a strategy can produce. Empty values let the chain fall through.
pub trait FacetValue: Default {
    fn is_empty_value(&self) -> bool;
}

impl<T> FacetValue for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl FacetValue for Pronunciations {
    fn is_empty_value(&self) -> bool {
        !self.iter().any(|(_, p)| !p.phonetic.is_empty())
    }
}

impl FacetValue for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

/// One named way of reading a facet from the document root.
pub struct Strategy<T> {
    pub name: &'static str,
    pub run: fn(ElementRef<'_>) -> T,
}

/// Result of running a chain.
#[derive(Debug)]
pub struct ChainOutcome<T> {
    pub value: T,
    /// Name of the strategy that produced `value`, or `None` if all were empty.
    pub matched: Option<&'static str>,
}

/// Ordered list of strategies for a single facet.
pub struct StrategyChain<T> {
    facet: &'static str,
    strategies: Vec<Strategy<T>>,
}

impl<T: FacetValue> StrategyChain<T> {
    pub fn new(facet: &'static str) -> Self {
        Self {
            facet,
            strategies: Vec::new(),
        }
    }

    /// Appends a strategy with lower priority than those already present.
    pub fn then(mut self, name: &'static str, run: fn(ElementRef<'_>) -> T) -> Self {
        self.strategies.push(Strategy { name, run });
        self
    }

    pub fn facet(&self) -> &'static str {
        self.facet
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name).collect()
    }

    /// Runs strategies in order and returns the first non-empty value.
    pub fn run(&self, root: ElementRef<'_>) -> ChainOutcome<T> {
        for strategy in &self.strategies {
            let value = (strategy.run)(root);
            if !value.is_empty_value() {
                tracing::trace!(facet = self.facet, strategy = strategy.name, "strategy matched");
                return ChainOutcome {
                    value,
                    matched: Some(strategy.name),
                };
            }
        }
        ChainOutcome {
            value: T::default(),
            matched: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn none(_: ElementRef<'_>) -> Vec<u32> {
        Vec::new()
    }

    fn one(_: ElementRef<'_>) -> Vec<u32> {
        vec![1]
    }

    fn two(_: ElementRef<'_>) -> Vec<u32> {
        vec![2, 2]
    }

    #[test]
    fn first_non_empty_strategy_wins() {
        let doc = Html::parse_document("<p>x</p>");
        let chain = StrategyChain::new("numbers")
            .then("empty", none)
            .then("one", one)
            .then("two", two);

        let outcome = chain.run(doc.root_element());

        assert_eq!(outcome.value, vec![1]);
        assert_eq!(outcome.matched, Some("one"));
    }

    #[test]
    fn all_empty_yields_default_and_no_match() {
        let doc = Html::parse_document("<p>x</p>");
        let chain = StrategyChain::new("numbers").then("a", none).then("b", none);

        let outcome = chain.run(doc.root_element());

        assert!(outcome.value.is_empty());
        assert_eq!(outcome.matched, None);
        assert_eq!(chain.strategy_names(), vec!["a", "b"]);
        assert_eq!(chain.facet(), "numbers");
    }
}
