//! Rule engine for tunemirror
//!
//! Every decision the planner makes about a file comes from a rule table:
//!
//! - **encode**: skip, copy, re-encode, or convert to another format
//! - **path**: where the file lands in the mirror
//! - **options** / **effect options**: extra encoder arguments
//! - **clobber**: what to do when the target path is taken
//! - **remove missing**: whether stale target files are deleted
//!
//! Rules pair a [`Selector`] with an action or a predicate. Within a table they are
//! ordered by strictness, so specific rules are tried before general ones no matter
//! in which order they were registered.
//!
//! # Examples
//!
//! ```rust
//! use tunemirror_rules::{ClobberAction, RuleBook, Selector};
//!
//! # fn main() -> tunemirror_types::Result<()> {
//! let mut rules = RuleBook::new();
//! rules.copy(Selector::codec("mp3"))?;
//! rules.clobber(Selector::everything(), ClobberAction::Rename)?;
//! rules.remove_missing(Selector::everything().with_pattern(r"\.keep$")?, false)?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod actions;
pub mod book;
pub mod rule;
pub mod selector;
pub mod table;

#[cfg(test)]
mod testing;

pub use actions::{ClobberAction, EncodeAction, PathAction};
pub use book::RuleBook;
pub use rule::{sort_by_strictness, MatchRule, Predicate, RuleOutcome};
pub use selector::{normalize_extension, Category, Selector, CATEGORY_KEYWORDS};
pub use table::RuleTable;
