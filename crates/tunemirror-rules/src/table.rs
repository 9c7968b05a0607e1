//! Ordered rule collections and resolution

use crate::rule::{sort_by_strictness, MatchRule};
use tunemirror_media::MediaDescriptor;

/// Rules for one decision, kept most strict first
#[derive(Debug, Clone)]
pub struct RuleTable<A> {
    rules: Vec<MatchRule<A>>,
}

impl<A: Clone> RuleTable<A> {
    /// Empty table
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a rule, replacing a static rule with the same selector
    pub fn insert(&mut self, rule: MatchRule<A>) {
        let mut rules = std::mem::take(&mut self.rules);
        rules.retain(|existing| !existing.is_replaced_by(&rule));
        rules.push(rule);
        self.rules = sort_by_strictness(rules);
    }

    /// Action of the first rule matching `file`
    pub fn resolve(&self, file: &MediaDescriptor) -> Option<A> {
        self.rules.iter().find_map(|rule| rule.test(file))
    }

    /// Rules in test order
    pub fn iter(&self) -> impl Iterator<Item = &MatchRule<A>> {
        self.rules.iter()
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the table has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<A: Clone> Default for RuleTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::Selector;
    use crate::testing::Library;

    #[test]
    fn test_resolution_ignores_registration_order() {
        let library = Library::new();
        let mp3 = library.file("a.mp3");
        let cover = library.file("cover.jpg");

        let mut forward = RuleTable::new();
        forward.insert(MatchRule::new(Selector::everything(), "copy"));
        forward.insert(MatchRule::new(Selector::lossy(), "skip"));

        let mut backward = RuleTable::new();
        backward.insert(MatchRule::new(Selector::lossy(), "skip"));
        backward.insert(MatchRule::new(Selector::everything(), "copy"));

        for table in [&forward, &backward] {
            assert_eq!(table.resolve(&mp3), Some("skip"));
            assert_eq!(table.resolve(&cover), Some("copy"));
        }
    }

    #[test]
    fn test_concrete_pattern_resolves_first() {
        let library = Library::new();
        let live = library.file("live/a.mp3");

        let mut table = RuleTable::new();
        table.insert(MatchRule::new(Selector::codec("mp3"), "codec"));
        table.insert(MatchRule::new(
            Selector::codec("mp3").with_pattern("live/").unwrap(),
            "live",
        ));

        assert_eq!(table.resolve(&live), Some("live"));
    }

    #[test]
    fn test_reregistration_replaces_static_rule() {
        let library = Library::new();
        let mp3 = library.file("a.mp3");

        let mut table = RuleTable::new();
        table.insert(MatchRule::new(Selector::lossy(), "first"));
        table.insert(MatchRule::new(Selector::lossy(), "second"));

        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(&mp3), Some("second"));
    }

    #[test]
    fn test_predicate_rules_accumulate() {
        let library = Library::new();
        let mp3 = library.file("a.mp3");

        let mut table = RuleTable::new();
        table.insert(MatchRule::with_predicate(Selector::lossy(), |_| None));
        table.insert(MatchRule::with_predicate(Selector::lossy(), |_| Some("fallback")));

        assert_eq!(table.len(), 2);
        assert_eq!(table.resolve(&mp3), Some("fallback"));
    }

    #[test]
    fn test_empty_table_has_no_match() {
        let library = Library::new();
        let table: RuleTable<bool> = RuleTable::new();
        assert!(table.is_empty());
        assert_eq!(table.resolve(&library.file("a.mp3")), None);
    }
}
