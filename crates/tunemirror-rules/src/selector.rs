//! File selectors: category, extension, bitrate threshold and path pattern

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tunemirror_media::MediaDescriptor;
use tunemirror_types::{normalize_codec, Error, Result};

/// Category keywords that cannot name a codec or a target extension
pub const CATEGORY_KEYWORDS: &[&str] = &["everything", "audio", "nonaudio", "lossy", "lossless"];

/// Which kind of file a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Category {
    /// Every file
    #[default]
    Everything,
    /// Any file the prober recognizes as audio
    Audio,
    /// Files the prober does not recognize
    NonAudio,
    /// Audio in a lossy codec
    Lossy,
    /// Audio in a lossless codec
    Lossless,
    /// Audio in exactly this codec
    Codec(String),
}

impl Category {
    /// Specific codec category (`ogg` is folded into `vorbis`)
    pub fn codec(name: &str) -> Self {
        Self::Codec(normalize_codec(name))
    }

    /// Strictness rank: codec > lossy/lossless/nonaudio > audio > everything
    pub fn rank(&self) -> u8 {
        match self {
            Self::Everything => 0,
            Self::Audio => 1,
            Self::NonAudio | Self::Lossy | Self::Lossless => 2,
            Self::Codec(_) => 3,
        }
    }

    /// Keyword or codec name
    pub fn name(&self) -> &str {
        match self {
            Self::Everything => "everything",
            Self::Audio => "audio",
            Self::NonAudio => "nonaudio",
            Self::Lossy => "lossy",
            Self::Lossless => "lossless",
            Self::Codec(codec) => codec,
        }
    }

    /// Whether only `copy`/`skip` make sense for files in this category
    pub fn may_include_non_audio(&self) -> bool {
        matches!(self, Self::Everything | Self::NonAudio)
    }

    /// Category check against a file
    pub fn matches(&self, file: &MediaDescriptor) -> bool {
        match self {
            Self::Everything => true,
            Self::Audio => file.is_audio(),
            Self::NonAudio => !file.is_audio(),
            Self::Lossy => file.is_lossy(),
            Self::Lossless => file.is_lossless(),
            Self::Codec(codec) => file.kind().codec() == Some(codec.as_str()),
        }
    }

    /// Stricter category compares `Greater`
    ///
    /// Same-rank categories fall back to their names; the smaller name is stricter.
    pub fn compare_strictness(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.rank()
            .cmp(&other.rank())
            .then_with(|| other.name().cmp(self.name()))
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Ok(match name.as_str() {
            "everything" => Self::Everything,
            "audio" => Self::Audio,
            "nonaudio" => Self::NonAudio,
            "lossy" => Self::Lossy,
            "lossless" => Self::Lossless,
            "" => return Err(Error::config("empty category name")),
            codec => Self::codec(codec),
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which files a rule applies to
///
/// Every field defaults to a wildcard. Extensions are stored with a leading dot.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    category: Category,
    extension: String,
    min_bitrate_kbps: f64,
    pattern: Option<Regex>,
}

impl Selector {
    /// Selector matching every file
    pub fn everything() -> Self {
        Self::default()
    }

    /// Selector for a category
    pub fn category(category: Category) -> Self {
        Self {
            category,
            ..Self::default()
        }
    }

    /// Selector for audio files
    pub fn audio() -> Self {
        Self::category(Category::Audio)
    }

    /// Selector for non-audio files
    pub fn nonaudio() -> Self {
        Self::category(Category::NonAudio)
    }

    /// Selector for lossy audio
    pub fn lossy() -> Self {
        Self::category(Category::Lossy)
    }

    /// Selector for lossless audio
    pub fn lossless() -> Self {
        Self::category(Category::Lossless)
    }

    /// Selector for one codec
    pub fn codec(name: &str) -> Self {
        Self::category(Category::codec(name))
    }

    /// Restrict to an extension (`mp3` and `.mp3` are the same)
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = normalize_extension(extension);
        self
    }

    /// Require a bitrate strictly above `kbps`
    pub fn with_min_bitrate(mut self, kbps: f64) -> Self {
        self.min_bitrate_kbps = kbps;
        self
    }

    /// Restrict to paths matching a regular expression
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::config(format!("invalid pattern '{}': {}", pattern, e)))?;
        self.pattern = Some(regex);
        Ok(self)
    }

    /// Category part
    pub fn category_ref(&self) -> &Category {
        &self.category
    }

    /// Extension with leading dot, empty for any
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Exclusive bitrate threshold, 0 for none
    pub fn min_bitrate_kbps(&self) -> f64 {
        self.min_bitrate_kbps
    }

    /// Pattern source, if any
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Check the selector against a file
    ///
    /// Fields are checked category first, then bitrate, extension and pattern, so the
    /// prober only runs when the category or the threshold needs it.
    pub fn matches(&self, file: &MediaDescriptor) -> bool {
        if !self.category.matches(file) {
            return false;
        }

        if self.min_bitrate_kbps > 0.0 && file.bitrate_kbps() <= self.min_bitrate_kbps {
            return false;
        }

        if !self.extension.is_empty() && file.extension() != self.extension {
            return false;
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.is_match(&file.path().to_string_lossy()) {
                return false;
            }
        }

        true
    }

    /// Compare everything but the predicate step of rule strictness
    ///
    /// `None` when both selectors carry different concrete patterns.
    pub fn compare_strictness(&self, other: &Self) -> Option<Ordering> {
        match (self.pattern(), other.pattern()) {
            (Some(_), None) => return Some(Ordering::Greater),
            (None, Some(_)) => return Some(Ordering::Less),
            (Some(a), Some(b)) if a != b => return None,
            _ => {}
        }

        let category = self.category.compare_strictness(&other.category);
        if category != Ordering::Equal {
            return Some(category);
        }

        if self.extension != other.extension {
            return Some(match (self.extension.is_empty(), other.extension.is_empty()) {
                (true, _) => Ordering::Less,
                (_, true) => Ordering::Greater,
                _ => other.extension.cmp(&self.extension),
            });
        }

        Some(self.min_bitrate_kbps.total_cmp(&other.min_bitrate_kbps))
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.min_bitrate_kbps.is_finite() || self.min_bitrate_kbps < 0.0 {
            return Err(Error::config(format!(
                "minimum bitrate must be a non-negative number, got {}",
                self.min_bitrate_kbps
            )));
        }
        Ok(())
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.category == other.category
            && self.extension == other.extension
            && self.min_bitrate_kbps.total_cmp(&other.min_bitrate_kbps) == Ordering::Equal
            && self.pattern() == other.pattern()
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category)?;
        if !self.extension.is_empty() {
            write!(f, " {}", self.extension)?;
        }
        if self.min_bitrate_kbps > 0.0 {
            write!(f, " >{}kbps", self.min_bitrate_kbps)?;
        }
        if let Some(pattern) = self.pattern() {
            write!(f, " /{}/", pattern)?;
        }
        Ok(())
    }
}

/// Add a leading dot to a non-empty extension
pub fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{}", extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Library;
    use rstest::rstest;

    #[rstest]
    #[case("ogg", Category::Codec("vorbis".into()))]
    #[case("Vorbis", Category::Codec("vorbis".into()))]
    #[case("lossless", Category::Lossless)]
    #[case("nonaudio", Category::NonAudio)]
    fn test_category_parsing(#[case] text: &str, #[case] expected: Category) {
        assert_eq!(text.parse::<Category>().unwrap(), expected);
    }

    #[test]
    fn test_category_ranks() {
        assert_eq!(
            Category::codec("mp3").compare_strictness(&Category::Lossy),
            Ordering::Greater
        );
        assert_eq!(
            Category::Lossy.compare_strictness(&Category::Audio),
            Ordering::Greater
        );
        assert_eq!(
            Category::Audio.compare_strictness(&Category::Everything),
            Ordering::Greater
        );
        // same rank: smaller name is stricter
        assert_eq!(
            Category::codec("flac").compare_strictness(&Category::codec("mp3")),
            Ordering::Greater
        );
        assert_eq!(
            Category::Lossy.compare_strictness(&Category::Lossless),
            Ordering::Less
        );
    }

    #[test]
    fn test_extension_normalization() {
        assert_eq!(normalize_extension("mp3"), ".mp3");
        assert_eq!(normalize_extension(".mp3"), ".mp3");
        assert_eq!(normalize_extension(""), "");
        assert_eq!(Selector::everything().with_extension("ogg").extension(), ".ogg");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(Selector::everything().with_pattern("(unclosed").is_err());
    }

    #[test]
    fn test_matching() {
        let library = Library::new();
        let mp3 = library.file("bach/prelude.mp3");
        let flac = library.file("bach/fugue.flac");
        let cover = library.file("bach/cover.jpg");

        assert!(Selector::lossy().matches(&mp3));
        assert!(!Selector::lossy().matches(&flac));
        assert!(Selector::lossless().matches(&flac));
        assert!(Selector::nonaudio().matches(&cover));
        assert!(!Selector::audio().matches(&cover));
        assert!(Selector::codec("mp3").matches(&mp3));

        // 128 kbps mp3: threshold is exclusive
        assert!(Selector::lossy().with_min_bitrate(96.0).matches(&mp3));
        assert!(!Selector::lossy().with_min_bitrate(128.0).matches(&mp3));

        assert!(Selector::everything().with_extension("jpg").matches(&cover));
        assert!(!Selector::everything().with_extension("jpg").matches(&mp3));

        let bach = Selector::everything().with_pattern("bach/p").unwrap();
        assert!(bach.matches(&mp3));
        assert!(!bach.matches(&flac));
    }

    #[test]
    fn test_vorbis_matches_ogg_codec() {
        let library = Library::new();
        let ogg = library.file("song.ogg");
        assert!(Selector::codec("ogg").matches(&ogg));
        assert!(Selector::codec("vorbis").matches(&ogg));
    }

    #[test]
    fn test_everything_never_probes() {
        let library = Library::new();
        let file = library.file("anything.flac");
        assert!(Selector::everything().with_extension("flac").matches(&file));
        assert_eq!(library.probe_calls(), 0);
    }

    #[test]
    fn test_selector_equality_uses_pattern_text() {
        let a = Selector::lossy().with_pattern("x").unwrap();
        let b = Selector::lossy().with_pattern("x").unwrap();
        let c = Selector::lossy().with_pattern("y").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_pattern_strictness() {
        let concrete = Selector::everything().with_pattern("live").unwrap();
        let other = Selector::codec("mp3").with_pattern("demo").unwrap();
        assert_eq!(
            concrete.compare_strictness(&Selector::codec("mp3")),
            Some(Ordering::Greater)
        );
        assert_eq!(concrete.compare_strictness(&other), None);
    }

    #[test]
    fn test_extension_and_bitrate_strictness() {
        let named = Selector::lossy().with_extension("mp3");
        assert_eq!(
            named.compare_strictness(&Selector::lossy()),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Selector::lossy()
                .with_extension("aac")
                .compare_strictness(&named),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Selector::lossy()
                .with_min_bitrate(192.0)
                .compare_strictness(&Selector::lossy().with_min_bitrate(96.0)),
            Some(Ordering::Greater)
        );
    }
}
