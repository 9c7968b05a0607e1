//! The six rule tables and their validated registration API

use crate::actions::{ClobberAction, EncodeAction, PathAction};
use crate::rule::MatchRule;
use crate::selector::{Category, Selector};
use crate::table::RuleTable;
use tracing::debug;
use tunemirror_media::MediaDescriptor;
use tunemirror_types::{Error, Result};

/// Every rule that drives a sync run
///
/// Registration methods validate their input and return a configuration error before
/// anything touches the filesystem. They return `&mut Self` so registrations chain:
///
/// ```rust
/// use tunemirror_rules::{EncodeAction, RuleBook, Selector};
///
/// # fn main() -> tunemirror_types::Result<()> {
/// let mut rules = RuleBook::new();
/// rules
///     .skip(Selector::lossy().with_min_bitrate(96.0))?
///     .encode(Selector::lossless(), EncodeAction::convert_with_quality(Some("ogg"), 6.0))?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RuleBook {
    encode: RuleTable<EncodeAction>,
    path: RuleTable<PathAction>,
    options: RuleTable<String>,
    effect_options: RuleTable<String>,
    clobber: RuleTable<ClobberAction>,
    remove_missing: RuleTable<bool>,
}

impl RuleBook {
    /// Rule book with the default rules
    ///
    /// Everything is copied to its original relative path, existing targets are
    /// overwritten, stale target files are removed, and audio gets empty encoder and
    /// effect options.
    pub fn new() -> Self {
        let mut book = Self::empty();
        book.encode
            .insert(MatchRule::new(Selector::everything(), EncodeAction::Copy));
        book.path.insert(MatchRule::new(
            Selector::everything(),
            PathAction::PreserveRelative,
        ));
        book.clobber
            .insert(MatchRule::new(Selector::everything(), ClobberAction::Overwrite));
        book.remove_missing
            .insert(MatchRule::new(Selector::everything(), true));
        book.options
            .insert(MatchRule::new(Selector::audio(), String::new()));
        book.effect_options
            .insert(MatchRule::new(Selector::audio(), String::new()));
        book
    }

    /// Rule book with no rules at all
    pub fn empty() -> Self {
        Self {
            encode: RuleTable::new(),
            path: RuleTable::new(),
            options: RuleTable::new(),
            effect_options: RuleTable::new(),
            clobber: RuleTable::new(),
            remove_missing: RuleTable::new(),
        }
    }

    /// Set how matching files are encoded
    ///
    /// Selectors that can match non-audio files (`everything`, `nonaudio`) only allow
    /// `Copy` or `Skip`.
    pub fn encode(&mut self, selector: Selector, action: EncodeAction) -> Result<&mut Self> {
        selector.validate()?;
        action.validate()?;
        if selector.category_ref().may_include_non_audio() && !action.is_copy_or_skip() {
            return Err(Error::config(format!(
                "encode rules for '{}' may only copy or skip",
                selector.category_ref()
            )));
        }
        debug!("encode rule: {} => {}", selector, action);
        self.encode.insert(MatchRule::new(selector, action));
        Ok(self)
    }

    /// Set how matching files are encoded, computed per file
    pub fn encode_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<EncodeAction> + Send + Sync + 'static,
    {
        selector.validate()?;
        self.encode.insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Copy matching files unchanged
    pub fn copy(&mut self, selector: Selector) -> Result<&mut Self> {
        self.encode(selector, EncodeAction::Copy)
    }

    /// Leave matching files out of the mirror
    pub fn skip(&mut self, selector: Selector) -> Result<&mut Self> {
        self.encode(selector, EncodeAction::Skip)
    }

    /// Set how target paths are derived
    pub fn path(&mut self, selector: Selector, action: PathAction) -> Result<&mut Self> {
        selector.validate()?;
        self.path.insert(MatchRule::new(selector, action));
        Ok(self)
    }

    /// Set how target paths are derived, computed per file
    pub fn path_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<PathAction> + Send + Sync + 'static,
    {
        selector.validate()?;
        self.path.insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Set the encoder option string for matching files
    pub fn options<S: Into<String>>(&mut self, selector: Selector, options: S) -> Result<&mut Self> {
        Self::check_audio_only(&selector, "options")?;
        self.options.insert(MatchRule::new(selector, options.into()));
        Ok(self)
    }

    /// Set the encoder option string, computed per file
    pub fn options_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<String> + Send + Sync + 'static,
    {
        Self::check_audio_only(&selector, "options")?;
        self.options
            .insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Set the effect option string for matching files
    pub fn effect_options<S: Into<String>>(
        &mut self,
        selector: Selector,
        options: S,
    ) -> Result<&mut Self> {
        Self::check_audio_only(&selector, "effect options")?;
        self.effect_options
            .insert(MatchRule::new(selector, options.into()));
        Ok(self)
    }

    /// Set the effect option string, computed per file
    pub fn effect_options_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<String> + Send + Sync + 'static,
    {
        Self::check_audio_only(&selector, "effect options")?;
        self.effect_options
            .insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Set what happens when a target path is already taken
    ///
    /// Matched against the source file, not the existing target.
    pub fn clobber(&mut self, selector: Selector, action: ClobberAction) -> Result<&mut Self> {
        selector.validate()?;
        action.validate()?;
        self.clobber.insert(MatchRule::new(selector, action));
        Ok(self)
    }

    /// Set what happens when a target path is taken, computed per file
    pub fn clobber_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<ClobberAction> + Send + Sync + 'static,
    {
        selector.validate()?;
        self.clobber
            .insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Set whether matching target files without a source are deleted
    ///
    /// Matched against the file in the target tree.
    pub fn remove_missing(&mut self, selector: Selector, remove: bool) -> Result<&mut Self> {
        selector.validate()?;
        self.remove_missing.insert(MatchRule::new(selector, remove));
        Ok(self)
    }

    /// Set whether stale target files are deleted, computed per file
    pub fn remove_missing_with<F>(&mut self, selector: Selector, predicate: F) -> Result<&mut Self>
    where
        F: Fn(&MediaDescriptor) -> Option<bool> + Send + Sync + 'static,
    {
        selector.validate()?;
        self.remove_missing
            .insert(MatchRule::with_predicate(selector, predicate));
        Ok(self)
    }

    /// Encode rules
    pub fn encode_rules(&self) -> &RuleTable<EncodeAction> {
        &self.encode
    }

    /// Path rules
    pub fn path_rules(&self) -> &RuleTable<PathAction> {
        &self.path
    }

    /// Encoder option rules
    pub fn option_rules(&self) -> &RuleTable<String> {
        &self.options
    }

    /// Effect option rules
    pub fn effect_option_rules(&self) -> &RuleTable<String> {
        &self.effect_options
    }

    /// Clobber rules
    pub fn clobber_rules(&self) -> &RuleTable<ClobberAction> {
        &self.clobber
    }

    /// Remove-missing rules
    pub fn remove_missing_rules(&self) -> &RuleTable<bool> {
        &self.remove_missing
    }

    fn check_audio_only(selector: &Selector, table: &str) -> Result<()> {
        selector.validate()?;
        match selector.category_ref() {
            Category::Everything | Category::NonAudio => Err(Error::config(format!(
                "{} rules cannot select '{}' files",
                table,
                selector.category_ref()
            ))),
            _ => Ok(()),
        }
    }
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::new()
    }
}
