//! A single selector/action pair

use crate::selector::Selector;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;
use tunemirror_media::MediaDescriptor;

/// Computes an action from a file; `None` means the rule does not match
pub type Predicate<A> = Arc<dyn Fn(&MediaDescriptor) -> Option<A> + Send + Sync>;

/// What a matching rule produces
#[derive(Clone)]
pub enum RuleOutcome<A> {
    /// A fixed action
    Static(A),
    /// An action computed per file
    Predicate(Predicate<A>),
}

impl<A: fmt::Debug> fmt::Debug for RuleOutcome<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(action) => f.debug_tuple("Static").field(action).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Immutable selector plus outcome
#[derive(Debug, Clone)]
pub struct MatchRule<A> {
    selector: Selector,
    outcome: RuleOutcome<A>,
}

impl<A: Clone> MatchRule<A> {
    /// Rule with a fixed action
    pub fn new(selector: Selector, action: A) -> Self {
        Self {
            selector,
            outcome: RuleOutcome::Static(action),
        }
    }

    /// Rule whose action is computed by `predicate`
    pub fn with_predicate<F>(selector: Selector, predicate: F) -> Self
    where
        F: Fn(&MediaDescriptor) -> Option<A> + Send + Sync + 'static,
    {
        Self {
            selector,
            outcome: RuleOutcome::Predicate(Arc::new(predicate)),
        }
    }

    /// Selector part
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Outcome part
    pub fn outcome(&self) -> &RuleOutcome<A> {
        &self.outcome
    }

    /// Whether the outcome is a fixed action
    pub fn is_static(&self) -> bool {
        matches!(self.outcome, RuleOutcome::Static(_))
    }

    /// Action for `file`, or `None` if the rule does not apply
    pub fn test(&self, file: &MediaDescriptor) -> Option<A> {
        if !self.selector.matches(file) {
            return None;
        }
        match &self.outcome {
            RuleOutcome::Static(action) => Some(action.clone()),
            RuleOutcome::Predicate(predicate) => predicate(file),
        }
    }

    /// `Greater` when `self` should be tested before `other`
    ///
    /// Pattern, category, extension and bitrate are compared in that order; a static
    /// rule beats a predicate rule on an otherwise equal selector. `None` means the
    /// rules are incomparable (different concrete patterns).
    pub fn compare_strictness(&self, other: &Self) -> Option<Ordering> {
        match self.selector.compare_strictness(&other.selector)? {
            Ordering::Equal => Some(self.is_static().cmp(&other.is_static())),
            ordering => Some(ordering),
        }
    }

    /// Whether a new registration of `other` replaces `self`
    pub(crate) fn is_replaced_by(&self, other: &Self) -> bool {
        self.is_static() && other.is_static() && self.selector == other.selector
    }
}

/// Order rules most strict first, keeping registration order where the order allows
///
/// Strictness is a partial order, so a comparison sort cannot be used. Each round
/// takes the earliest remaining rule that no other remaining rule is stricter than.
pub fn sort_by_strictness<A: Clone>(rules: Vec<MatchRule<A>>) -> Vec<MatchRule<A>> {
    let mut remaining = rules;
    let mut sorted = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let next = (0..remaining.len())
            .find(|&i| {
                !remaining.iter().any(|other| {
                    other.compare_strictness(&remaining[i]) == Some(Ordering::Greater)
                })
            })
            .unwrap_or(0);
        sorted.push(remaining.remove(next));
    }

    sorted
}
