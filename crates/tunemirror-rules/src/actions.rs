//! Actions produced by each rule table

use crate::selector::{normalize_extension, CATEGORY_KEYWORDS};
use std::fmt;
use tunemirror_types::{Error, Result};

/// What to do with a matched source file
#[derive(Debug, Clone, PartialEq)]
pub enum EncodeAction {
    /// Leave the file out of the mirror
    Skip,
    /// Copy the file unchanged
    Copy,
    /// Re-encode into the same format
    Reencode,
    /// Encode into another format and/or at a given quality
    Convert {
        /// Target extension with leading dot; the source extension when `None`
        extension: Option<String>,
        /// Value passed to the encoder as `-C <quality>`
        quality: Option<f64>,
    },
}

impl EncodeAction {
    /// Convert to `extension`
    pub fn convert_to(extension: &str) -> Self {
        Self::Convert {
            extension: Some(normalize_extension(extension)),
            quality: None,
        }
    }

    /// Convert to `extension` at `quality`
    pub fn convert_with_quality(extension: Option<&str>, quality: f64) -> Self {
        Self::Convert {
            extension: extension.map(normalize_extension),
            quality: Some(quality),
        }
    }

    /// Quality level, if any
    pub fn quality(&self) -> Option<f64> {
        match self {
            Self::Convert { quality, .. } => *quality,
            _ => None,
        }
    }

    /// Extension of the mirrored file given the source extension
    pub fn target_extension(&self, source_extension: &str) -> String {
        match self {
            Self::Convert {
                extension: Some(extension),
                ..
            } => normalize_extension(extension),
            _ => source_extension.to_string(),
        }
    }

    /// Whether this action only ever moves bytes unchanged
    pub fn is_copy_or_skip(&self) -> bool {
        matches!(self, Self::Copy | Self::Skip)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let Self::Convert { extension, quality } = self else {
            return Ok(());
        };

        match (extension, quality) {
            (None, None) => Err(Error::config(
                "a conversion needs a target extension or a quality",
            )),
            (Some(extension), _)
                if CATEGORY_KEYWORDS.contains(&extension.trim_start_matches('.')) =>
            {
                Err(Error::config(format!(
                    "'{}' is a category, not a target format",
                    extension.trim_start_matches('.')
                )))
            }
            (Some(extension), _) if extension.trim_start_matches('.').is_empty() => {
                Err(Error::config("empty target extension"))
            }
            (_, Some(quality)) if !quality.is_finite() => {
                Err(Error::config(format!("invalid quality {}", quality)))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for EncodeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => f.write_str("skip"),
            Self::Copy => f.write_str("copy"),
            Self::Reencode => f.write_str("reencode"),
            Self::Convert { extension, quality } => {
                f.write_str("convert")?;
                if let Some(extension) = extension {
                    write!(f, " to {}", extension)?;
                }
                if let Some(quality) = quality {
                    write!(f, " at {}", quality)?;
                }
                Ok(())
            }
        }
    }
}

/// How the target path is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathAction {
    /// Keep the source's path relative to the source root
    #[default]
    PreserveRelative,
}

/// What to do when the target path is taken
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClobberAction {
    /// Write over the existing file
    Overwrite,
    /// Leave the existing file alone
    Keep,
    /// Insert this text before the extension, overwriting anything already there
    Suffix(String),
    /// Insert ` (1)`, ` (2)`, ... until the name is free
    Rename,
}

impl ClobberAction {
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            Self::Suffix(suffix) if suffix.is_empty() => {
                Err(Error::config("clobber suffix must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl From<bool> for ClobberAction {
    fn from(overwrite: bool) -> Self {
        if overwrite {
            Self::Overwrite
        } else {
            Self::Keep
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(EncodeAction::Copy, ".flac", ".flac")]
    #[case(EncodeAction::Reencode, ".flac", ".flac")]
    #[case(EncodeAction::convert_to("ogg"), ".flac", ".ogg")]
    #[case(EncodeAction::convert_with_quality(None, 6.0), ".flac", ".flac")]
    #[case(EncodeAction::convert_to("mp3"), "", ".mp3")]
    #[case(EncodeAction::Copy, "", "")]
    fn test_target_extension(
        #[case] action: EncodeAction,
        #[case] source: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(action.target_extension(source), expected);
    }

    #[test]
    fn test_convert_validation() {
        assert!(EncodeAction::Convert {
            extension: None,
            quality: None
        }
        .validate()
        .is_err());
        assert!(EncodeAction::convert_to("lossy").validate().is_err());
        assert!(EncodeAction::convert_to("ogg").validate().is_ok());
        assert!(EncodeAction::convert_with_quality(None, 3.0).validate().is_ok());
    }

    #[test]
    fn test_clobber_from_bool() {
        assert_eq!(ClobberAction::from(true), ClobberAction::Overwrite);
        assert_eq!(ClobberAction::from(false), ClobberAction::Keep);
        assert!(ClobberAction::Suffix(String::new()).validate().is_err());
        assert!(ClobberAction::Suffix("-new".into()).validate().is_ok());
    }
}
